use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use courseware_core::ModuleForm;

#[derive(Debug, Parser)]
#[command(name = "courseware_app")]
#[command(about = "Upload course modules and manage the offline asset cache")]
pub struct Cli {
    /// RON config file; defaults to courseware.ron in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Upload a file and create a module for it.
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        /// text, video or pdf
        #[arg(long = "type")]
        type_tag: String,
        #[arg(long)]
        order: String,
        #[arg(long = "course")]
        course_id: String,
    },
    /// Print the cache policy for each url.
    Route {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Pre-cache the shell from `origin` and drop stale generations.
    Cache { origin: String },
}

impl Command {
    /// Raw form fields of an upload; numeric coercion happens in the core.
    pub fn module_form(&self) -> Option<ModuleForm> {
        match self {
            Command::Upload {
                title,
                type_tag,
                order,
                course_id,
                ..
            } => Some(ModuleForm {
                title: title.clone(),
                type_tag: type_tag.clone(),
                order: order.clone(),
                course_id: course_id.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("courseware_app").chain(raw.iter().copied()))
    }

    #[test]
    fn parses_upload_with_global_flags() {
        let cli = parse(&[
            "--config", "lms.ron", "upload", "intro.mp4", "--title", "Intro", "--type", "video",
            "--order", "1", "--course", "9", "-v",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("lms.ron")));
        assert!(cli.verbose);
        assert_eq!(
            cli.command.module_form(),
            Some(ModuleForm {
                title: "Intro".to_string(),
                type_tag: "video".to_string(),
                order: "1".to_string(),
                course_id: "9".to_string(),
            })
        );
        match cli.command {
            Command::Upload { file, .. } => assert_eq!(file, PathBuf::from("intro.mp4")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn no_arguments_is_a_usage_error() {
        let err = parse(&[]).unwrap_err();
        assert!(err.to_string().contains("Usage:"), "{err}");
    }

    #[test]
    fn missing_values_are_errors() {
        assert!(parse(&["upload", "a.pdf", "--title"]).is_err());
        assert!(parse(&["upload", "--title", "x"]).is_err());
        assert!(parse(&["route"]).is_err());
        assert!(parse(&["cache"]).is_err());
        assert!(parse(&["explode"]).is_err());
    }

    #[test]
    fn route_collects_all_urls() {
        let cli = parse(&["route", "/a.js", "/api/x"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Route {
                urls: vec!["/a.js".to_string(), "/api/x".to_string()]
            }
        );
        assert_eq!(cli.command.module_form(), None);
    }
}
