use clap::Parser;
use realzhub::config::{CliConfig, Command};
use realzhub::core::urls::Request;
use realzhub::utils::error::{ErrorSeverity, RealzError};
use realzhub::utils::logger::{self, LogFormat};
use realzhub::{AccessOutcome, Application, Principal, Project, ProjectBuilder, Settings};
use std::collections::BTreeMap;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(cli.verbose, format);

    tracing::info!("Starting realzhub CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli) {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

fn run(cli: &CliConfig) -> Result<(), RealzError> {
    let settings = match &cli.config {
        Some(path) => {
            tracing::info!("Loading settings from {}", path.display());
            Settings::from_file(path)?
        }
        None => Settings::default(),
    };

    let project = ProjectBuilder::new(settings).build()?;

    match &cli.command {
        Command::Resolve {
            module_label,
            classes,
        } => resolve(&project, module_label, classes),
        Command::Urls => {
            print_urls(&project);
            Ok(())
        }
        Command::Check {
            view,
            principal,
            kwargs,
        } => {
            let kwargs: BTreeMap<String, String> = kwargs.iter().cloned().collect();
            check(&project, view, principal.to_principal(), kwargs)
        }
    }
}

fn resolve(project: &Project, module_label: &str, classes: &[String]) -> Result<(), RealzError> {
    let names: Vec<&str> = classes.iter().map(String::as_str).collect();
    for class in project.loader().get_classes(module_label, &names)? {
        println!("{:<24} {}", class.name(), class.module());
    }
    Ok(())
}

fn print_urls(project: &Project) {
    for summary in project.describe_urls() {
        let permissions = if summary.permissions.is_empty() {
            "-".to_string()
        } else {
            summary
                .permissions
                .iter()
                .map(|spec| format!("[{}]", spec))
                .collect::<Vec<_>>()
                .join(" + ")
        };
        println!(
            "{:<28} {:<20} {}",
            summary.route,
            summary.name.unwrap_or_default(),
            permissions
        );
    }
}

fn check(
    project: &Project,
    view: &str,
    principal: Arc<dyn Principal>,
    kwargs: BTreeMap<String, String>,
) -> Result<(), RealzError> {
    let path = project.reverse(view, &kwargs)?;
    let mut request = Request::new(&path, principal);
    request.kwargs = kwargs;
    // 站台與 users app 的檢查都可能導向登入頁
    let site = project.site();
    let login_urls = [
        site.app_config().login_url(),
        site.users_app().app_config().login_url(),
    ];

    let outcome = match project.dispatch(view, &request) {
        Ok(response) if response.is_redirect() => {
            match response.location.as_deref() {
                Some(location) if login_urls.iter().any(|url| location.starts_with(url)) => {
                    println!("REDIRECT {}", location);
                    AccessOutcome::Redirect
                }
                _ => {
                    println!("PASS {} -> {:?}", response.status, response.location);
                    AccessOutcome::Pass
                }
            }
        }
        Ok(response) => {
            println!(
                "PASS {} {}",
                response.status,
                response.template.unwrap_or_default()
            );
            AccessOutcome::Pass
        }
        Err(RealzError::AccessDenied { .. }) => {
            println!("DENY");
            AccessOutcome::Deny
        }
        Err(e) => return Err(e),
    };

    tracing::info!("{} as '{}': {:?}", view, request.user.get_username(), outcome);
    Ok(())
}
