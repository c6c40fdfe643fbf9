// CLI commands (cmd_ prefix)
pub mod cmd_apply;
pub mod cmd_exercise;
pub mod cmd_plot;
pub mod cmd_serve;
pub mod cmd_status;

// Helper modules
pub mod logger;
