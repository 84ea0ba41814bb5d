use crate::principal::{Principal, Role};

/// What a request path requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable without a session.
    Public,
    /// Any authenticated principal.
    Authenticated,
    /// An authenticated principal holding the role.
    Role(Role),
}

/// Outcome of checking a caller against a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No principal on a protected path.
    Unauthenticated,
    /// Principal present but lacking the required role.
    Forbidden,
}

/// Ordered path rules; the first matching rule wins, anything unmatched
/// falls through to `Access::Authenticated`.
///
/// Patterns are either exact paths (`/admin`) or prefixes ending in `/**`
/// (`/css/**`, which matches `/css` and everything below it).
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<(String, Access)>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn permit_all<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .extend(patterns.into_iter().map(|p| (p.into(), Access::Public)));
        self
    }

    pub fn require_role(mut self, pattern: impl Into<String>, role: Role) -> Self {
        self.rules.push((pattern.into(), Access::Role(role)));
        self
    }

    /// Access rules of the book catalog.
    pub fn catalog() -> Self {
        Self::new()
            .permit_all([
                "/",
                "/login",
                "/loginfailure",
                "/logoutsuccess",
                "/invalidsession",
                "/authenticate",
                "/logout",
                "/error",
                "/healthz",
                "/css/**",
                "/js/**",
                "/img/**",
            ])
            .require_role("/admin", Role::Admin)
    }

    pub fn required_access(&self, path: &str) -> Access {
        self.rules
            .iter()
            .find(|(pattern, _)| matches(pattern, path))
            .map(|(_, access)| *access)
            .unwrap_or(Access::Authenticated)
    }

    pub fn decide(&self, path: &str, principal: Option<&Principal>) -> Decision {
        match (self.required_access(path), principal) {
            (Access::Public, _) => Decision::Allow,
            (_, None) => Decision::Unauthenticated,
            (Access::Role(role), Some(p)) if !p.has_role(role) => Decision::Forbidden,
            _ => Decision::Allow,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::catalog()
    }
}

fn matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/**") {
        Some(prefix) => {
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        None => pattern == path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_need_nothing() {
        let policy = AccessPolicy::catalog();
        for path in ["/", "/login", "/error", "/css/shelf.css", "/img/a/b.png"] {
            assert_eq!(policy.decide(path, None), Decision::Allow, "{path}");
        }
    }

    #[test]
    fn everything_else_needs_a_principal() {
        let policy = AccessPolicy::catalog();
        assert_eq!(policy.decide("/books", None), Decision::Unauthenticated);
        assert_eq!(policy.decide("/books/3", None), Decision::Unauthenticated);
        assert_eq!(policy.decide("/cssx", None), Decision::Unauthenticated);

        let user = Principal::new("user", Role::User);
        assert_eq!(policy.decide("/books", Some(&user)), Decision::Allow);
    }

    #[test]
    fn admin_path_needs_admin_role() {
        let policy = AccessPolicy::catalog();
        let user = Principal::new("user", Role::User);
        let admin = Principal::new("admin", Role::Admin);

        assert_eq!(policy.decide("/admin", None), Decision::Unauthenticated);
        assert_eq!(policy.decide("/admin", Some(&user)), Decision::Forbidden);
        assert_eq!(policy.decide("/admin", Some(&admin)), Decision::Allow);
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = AccessPolicy::new()
            .permit_all(["/docs/**"])
            .require_role("/docs/private", Role::Admin);
        assert_eq!(policy.required_access("/docs/private"), Access::Public);
    }
}
