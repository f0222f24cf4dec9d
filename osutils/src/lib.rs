pub mod dependencies;
pub mod files;
pub mod hosts;
pub mod osrelease;
pub mod path;
