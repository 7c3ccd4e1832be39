use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ut-create",
    about = "Create a project from a registry template and customise it through a form",
    version
)]
pub struct Cli {
    /// npm registry used to look up templates
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// How to show the configuration form: browser or terminal
    #[arg(long, value_name = "MODE")]
    pub form: Option<String>,

    /// Print the form URL instead of opening a browser
    #[arg(long)]
    pub no_open: bool,

    /// Show which files would change, then discard the clone
    #[arg(long)]
    pub dry_run: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// [TEMPLATE] [PROJECT_DIR] [--answer value ...]
    ///
    /// TEMPLATE is a keyword (ms, port, app, or a module name) or a path to
    /// an existing project. PROJECT_DIR must be named impl-* or ut-*.
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}
