use clap::{Args, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "lcd-menu", about = "Status menu for a two-line serial LCD panel")]
pub struct Cli {
    #[command(flatten)]
    pub ser: SerialOpts,
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyS1")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = 1200)]
    pub baud: u32,
}
