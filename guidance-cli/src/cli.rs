use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Questionnaire resolution and guidance assignment engine")]
pub struct Cli {
    /// Path to the snapshot file (master catalog, company config, rules, answers)
    #[clap(long, default_value = "snapshot.yaml")]
    pub file: String,

    /// Project id to resolve for
    #[clap(long, short = 'p')]
    pub project: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the resolved, ordered question tree for one form
    Questions {
        /// Which form to resolve (profile, assessment)
        #[clap(long, default_value = "profile")]
        form: String,

        /// Resolve for the editor view (keeps hidden questions, marked inactive)
        #[clap(long)]
        editor: bool,

        /// Output format (text, json)
        #[clap(long, short = 'f', default_value = "text")]
        format: String,
    },

    /// Show completion statistics for one form against the stored answers
    Progress {
        /// Which form to evaluate (profile, assessment)
        #[clap(long, default_value = "profile")]
        form: String,

        /// Output format (text, json)
        #[clap(long, short = 'f', default_value = "text")]
        format: String,
    },

    /// Evaluate the guidance rules and print the assigned tasks and tips
    Guidance {
        /// Output format (text, json)
        #[clap(long, short = 'f', default_value = "text")]
        format: String,
    },

    /// Check the snapshot for authoring defects
    Validate,
}
