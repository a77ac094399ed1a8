mod actions;
mod deploy;
mod status;

pub use actions::cmd_actions;
pub use deploy::{DeployArgs, cmd_deploy};
pub use status::cmd_status;
