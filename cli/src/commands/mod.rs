mod entry;
mod goals;
mod helpers;
mod import;
mod search;
mod session;
mod summary;

pub(crate) use entry::cmd_delete;
pub(crate) use goals::{cmd_goals_name, cmd_goals_set, cmd_goals_show};
pub(crate) use import::cmd_food_import;
pub(crate) use search::{FoodArgs, cmd_food_add, cmd_food_list, cmd_search};
pub(crate) use session::cmd_session;
pub(crate) use summary::cmd_summary;
