//! This module contains everything relating to [Data].

mod response;
mod store;

use std::collections::HashSet;
use std::sync::Arc;

use serenity::UserId;

use crate::lib::catalog::TaskCatalog;
use crate::lib::jobs::DailyScheduler;
use crate::serenity;
pub use response::Category;
pub use response::Tally;
pub use store::ResponseStore;

/// The data kept between shards
#[derive(Debug)]
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Responses of the current cycle.
    pub store: ResponseStore,
    /// Tasks and images to pick from.
    pub catalog: Arc<TaskCatalog>,
    /// The daily jobs, if scheduling is enabled.
    pub scheduler: Option<Arc<DailyScheduler>>,
}
