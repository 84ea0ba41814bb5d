pub mod books;
pub mod login;

use std::sync::Arc;

use shelf_kernel::ModuleRegistry;

/// Register the application's modules in mount order.
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(Arc::new(login::LoginModule::new()));
    registry.register(Arc::new(books::BooksModule::new()));
}
