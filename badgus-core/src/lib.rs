pub mod authz;
pub mod settings;
pub mod validation;

use std::sync::Arc;

use badgus_database::Database;
use badgus_mozillians::VouchService;

pub use settings::Settings;
pub use validation::ValidationError;

/// Shared state handed to every request.
#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
    pub settings: Arc<Settings>,
    pub vouch: Option<VouchService>,
}
