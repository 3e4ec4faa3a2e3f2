use crate::cli::Cli;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::ASCII_MARKDOWN, Cell, CellAlignment, Color, ContentArrangement};
use polyfmt::{print, println};

#[derive(Debug, Args, Clone)]
pub struct ProfileSubcommands {
    #[clap(subcommand)]
    pub command: ProfileCommands,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ProfileCommands {
    /// List all configured deployment profiles.
    List,

    /// Fetch full detail about an individual profile, including the derived names and
    /// tags a deployment of it will use.
    Get {
        /// Profile name.
        name: String,
    },
}

impl Cli {
    pub async fn handle_profile_subcommands(&self, command: ProfileSubcommands) -> Result<()> {
        let cmds = command.command;
        match cmds {
            ProfileCommands::List => self.profile_list().await,
            ProfileCommands::Get { name } => self.profile_get(&name).await,
        }
    }
}

impl Cli {
    pub async fn profile_list(&self) -> Result<()> {
        let mut table = comfy_table::Table::new();
        table
            .load_preset(ASCII_MARKDOWN)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("name")
                    .set_alignment(CellAlignment::Center)
                    .fg(Color::Blue),
                Cell::new("app")
                    .set_alignment(CellAlignment::Center)
                    .fg(Color::Blue),
                Cell::new("definition")
                    .set_alignment(CellAlignment::Center)
                    .fg(Color::Blue),
                Cell::new("platform")
                    .set_alignment(CellAlignment::Center)
                    .fg(Color::Blue),
                Cell::new("region")
                    .set_alignment(CellAlignment::Center)
                    .fg(Color::Blue),
            ]);

        for profile in &self.conf.profiles {
            table.add_row(vec![
                Cell::new(&profile.name).fg(Color::Green),
                Cell::new(&profile.app_name),
                Cell::new(profile.definition_path.display()),
                Cell::new(&profile.platform),
                Cell::new(&profile.region),
            ]);
        }

        println!("{}", &table.to_string());
        Ok(())
    }

    pub async fn profile_get(&self, name: &str) -> Result<()> {
        let Some(profile) = self.conf.profile(name) else {
            bail!(
                "Unknown profile '{}'; run 'stevedore profile list' to see what is configured",
                name
            );
        };

        const TEMPLATE: &str = r#"[{{name}}] deploys {{app}}
  Definition: {{definition}}
  Build context: {{context}} ({{platform}})
  Region: {{region}}

  Image: {{local_tag}} -> {{remote_tag}}
  Registry address output: {{registry_output}}
  Rollout target: service '{{service}}' on cluster '{{cluster}}'
"#;

        let mut tera = tera::Tera::default();
        tera.add_raw_template("main", TEMPLATE)
            .context("Failed to render context")?;

        let mut context = tera::Context::new();
        context.insert("name", &profile.name);
        context.insert("app", &profile.app_name);
        context.insert("definition", &profile.definition_path.display().to_string());
        context.insert("context", &profile.build_context.display().to_string());
        context.insert("platform", &profile.platform);
        context.insert("region", &profile.region);
        context.insert("local_tag", &profile.local_image_tag());
        context.insert("remote_tag", &profile.remote_image_tag("<registry address>"));
        context.insert("registry_output", &profile.registry_output);
        context.insert("service", &profile.service_name());
        context.insert("cluster", &profile.cluster_name());

        let content = tera.render("main", &context)?;
        print!("{}", content);
        Ok(())
    }
}
