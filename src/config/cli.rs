use crate::domain::principal::{AnonymousUser, Principal, User};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Parser)]
#[command(name = "realzhub")]
#[command(about = "Inspect class overrides and view permissions of a realzhub project")]
pub struct CliConfig {
    #[arg(long, short, help = "Path to the TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 顯示每個類別由哪個模組提供
    Resolve {
        module_label: String,
        #[arg(required = true)]
        classes: Vec<String>,
    },
    /// 列出 URL 與其權限需求
    Urls,
    /// 以指定身分呼叫視圖
    Check {
        view: String,
        #[command(flatten)]
        principal: PrincipalArgs,
        #[arg(long = "kwarg", value_parser = parse_kwarg, help = "URL argument as key=value")]
        kwargs: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PrincipalArgs {
    #[arg(long, conflicts_with_all = ["staff", "superuser", "inactive", "perms"])]
    pub anonymous: bool,

    #[arg(long, default_value = "cli")]
    pub username: String,

    #[arg(long)]
    pub staff: bool,

    #[arg(long)]
    pub superuser: bool,

    #[arg(long)]
    pub inactive: bool,

    #[arg(long = "perm", help = "Formal permission such as users.change_user")]
    pub perms: Vec<String>,
}

impl PrincipalArgs {
    pub fn to_principal(&self) -> Arc<dyn Principal> {
        if self.anonymous {
            return Arc::new(AnonymousUser);
        }

        let user = self.perms.iter().fold(
            User::new(&self.username)
                .staff(self.staff)
                .superuser(self.superuser)
                .active(!self.inactive),
            |user, perm| user.with_permission(perm),
        );
        Arc::new(user)
    }
}

fn parse_kwarg(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_command() {
        let cli = CliConfig::parse_from([
            "realzhub",
            "check",
            "users:detail",
            "--staff",
            "--perm",
            "users.view_user",
            "--kwarg",
            "username=alice",
        ]);

        match cli.command {
            Command::Check {
                view,
                principal,
                kwargs,
            } => {
                assert_eq!(view, "users:detail");
                assert_eq!(kwargs, vec![("username".to_string(), "alice".to_string())]);
                let user = principal.to_principal();
                assert!(user.is_authenticated());
                assert!(user.has_perms(&["users.view_user"]));
                assert_eq!(user.attribute("is_staff"), Some(true));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_anonymous_conflicts_with_staff() {
        let result =
            CliConfig::try_parse_from(["realzhub", "check", "home", "--anonymous", "--staff"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_kwarg() {
        assert!(parse_kwarg("username").is_err());
        assert_eq!(
            parse_kwarg("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
    }
}
