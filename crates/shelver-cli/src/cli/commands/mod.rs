//! CLI command handlers. Each command is in its own file.

mod add;
mod cleanup;
mod enqueue;
mod item;
mod jobs;
mod move_item;
mod name;
mod rank;
mod retry;
mod run;
mod stats;
mod sync;

pub use add::{run_add, AddArgs};
pub use cleanup::run_cleanup;
pub use enqueue::run_enqueue;
pub use item::run_item;
pub use jobs::{run_job, run_jobs};
pub use move_item::run_move;
pub use name::run_name;
pub use rank::run_rank;
pub use retry::run_retry;
pub use run::run_supervisor;
pub use stats::run_stats;
pub use sync::run_sync;
