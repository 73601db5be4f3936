//! # KB Backend 主程序
//!
//! 初始化数据库、维护第三方登录方式的命令行入口

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kb_backend::{
    Result,
    app::AppContext,
    auth::{AuthConfig, AuthType, OAuthConfig},
    config::{default_config_path, load_config},
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
    services::AuthInfo,
};

#[derive(Parser)]
#[command(name = "kb-backend")]
#[command(about = "Knowledge base backend administration", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径，默认 `config/config.{RUST_ENV}.toml`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 创建表结构、初始化内置管理员并加载已保存的登录方式
    Init,

    /// 启用或更新 OIDC 登录
    SetOidc {
        /// Issuer 地址
        #[arg(long)]
        issuer: String,
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        client_secret: String,
        /// 登录按钮文案
        #[arg(long, default_value = "OIDC 登录")]
        button_desc: String,
        /// 回调地址，默认由 `auth.public_url` 拼接
        #[arg(long)]
        redirect_url: Option<String>,
        /// 额外申请的 scope
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,
        /// 跳过提供商自检
        #[arg(long)]
        no_verify: bool,
    },

    /// 打印指定登录方式的授权跳转地址
    LoginUrl {
        /// 登录方式：oidc
        #[arg(value_name = "AUTH_TYPE", default_value = "oidc")]
        auth_type: AuthType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());

    let path = cli.config.unwrap_or_else(default_config_path);
    let config = load_config(&path)?;
    let context = AppContext::bootstrap(config).await?;

    if let Err(e) = run(&context, cli.command).await {
        lerror!(
            "system",
            LogStage::Internal,
            LogComponent::Main,
            "command_failed",
            &format!("命令执行失败: {e}")
        );
        return Err(e);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "command_done",
        "命令执行完成"
    );
    Ok(())
}

async fn run(context: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            let registered = context.auth_manager.registered().await;
            println!(
                "initialized, active providers: {:?}",
                registered.iter().map(|t| t.as_str()).collect::<Vec<_>>()
            );
        }
        Command::SetOidc {
            issuer,
            client_id,
            client_secret,
            button_desc,
            redirect_url,
            scopes,
            no_verify,
        } => {
            let info = AuthInfo {
                auth_type: AuthType::Oidc,
                button_desc,
                config: Some(AuthConfig {
                    oauth: OAuthConfig {
                        url: issuer,
                        client_id,
                        client_secret,
                        scopes,
                        redirect_url,
                    },
                }),
            };

            let mut settings = context.auth_service.settings().await?;
            settings.auth_infos.retain(|existing| existing.auth_type != AuthType::Oidc);
            settings.auth_infos.push(info);
            context
                .auth_service
                .update_settings(settings, !no_verify)
                .await?;
            println!("OIDC login updated");
        }
        Command::LoginUrl { auth_type } => {
            let request = context.auth_service.login_url(auth_type).await?;
            println!("{}", request.url);
            println!("state: {}", request.state);
        }
    }
    Ok(())
}
