pub mod books;
pub mod urls;

use shelf_db::Db;
use shelf_kernel::ModuleRegistry;

/// Register all service modules with the registry.
pub fn register_all(registry: &mut ModuleRegistry, db: &Db) {
    registry.register(books::create_module(db.clone()));
    registry.register(urls::create_module());
}
