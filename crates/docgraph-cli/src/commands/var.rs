//! Graph variable commands

use clap::{Args, Subcommand};

use crate::output::{format_list, format_output, parse_property, Entry, OutputFormat};
use crate::{AppContext, Cli};

#[derive(Args)]
pub struct VarArgs {
    #[command(subcommand)]
    pub command: VarCommands,
}

#[derive(Subcommand)]
pub enum VarCommands {
    /// Get a variable
    Get {
        /// Variable name
        key: String,
    },
    /// Set a variable; the value is read as JSON when it parses
    Set {
        /// Variable name
        key: String,
        /// New value
        value: String,
    },
    /// List all variables
    List,
}

pub async fn run(args: &VarArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let format = OutputFormat::from(cli.format.as_str());
    let mut variables = ctx.client.variables().await?;

    match &args.command {
        VarCommands::Get { key } => {
            let value = variables
                .get(key)
                .ok_or_else(|| anyhow::anyhow!("Unknown variable: {}", key))?;
            println!("{}", format_output(&Entry::new(key, value)?, format));
        }
        VarCommands::Set { key, value } => {
            let (_, value) = parse_property(&format!("{}={}", key, value))?;
            let entry = Entry::new(key, &value)?;
            variables.set(key, value)?;
            ctx.client.save_variables(&mut variables).await?;
            match format {
                OutputFormat::Json => println!("{}", format_output(&entry, format)),
                OutputFormat::Text => println!("Set {}", entry),
            }
        }
        VarCommands::List => {
            let entries = variables
                .keys()
                .filter_map(|key| variables.get(key).map(|value| Entry::new(key, value)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            println!("{}", format_list(&entries, format));
        }
    }

    Ok(())
}
