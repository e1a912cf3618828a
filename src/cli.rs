//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (reply, batch, demo, orders)
//! e flags globais (--config, --model, --offline, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Respostas de suporte ao cliente liberadas só após auditoria de conformidade.
#[derive(Debug, Parser)]
#[command(name = "support-gate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./support-gate.toml, se existir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Identificador do modelo; sobrescreve o arquivo de configuração.
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Usa a capacidade offline determinística mesmo com chave de API configurada.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Habilita logs de nível debug.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Redige a resposta para uma mensagem de cliente.
    Reply {
        /// Pedido ao qual a mensagem se refere.
        #[arg(long)]
        order: String,

        /// Mensagem do cliente.
        message: String,
    },

    /// Processa um array JSON de {order_id, customer_message} pela fila de tarefas.
    Batch {
        #[arg(long)]
        file: PathBuf,
    },

    /// Executa os cenários de demonstração embutidos (offline).
    Demo,

    /// Lista o catálogo de pedidos.
    Orders,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_reply_subcommand() {
        let cli = Cli::parse_from([
            "support-gate",
            "reply",
            "--order",
            "ORD123",
            "Where is my order?",
        ]);
        match cli.command {
            Command::Reply { order, message } => {
                assert_eq!(order, "ORD123");
                assert_eq!(message, "Where is my order?");
            }
            _ => panic!("expected Reply command"),
        }
    }

    #[test]
    fn reply_requires_order() {
        assert!(Cli::try_parse_from(["support-gate", "reply", "hello"]).is_err());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "support-gate",
            "--model",
            "claude-sonnet-4-5",
            "--offline",
            "--config",
            "alt.toml",
            "--verbose",
            "demo",
        ]);
        assert!(cli.verbose);
        assert!(cli.offline);
        assert_eq!(cli.model.as_deref(), Some("claude-sonnet-4-5"));
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Command::Demo));
    }

    #[test]
    fn cli_parses_batch_subcommand() {
        let cli = Cli::parse_from(["support-gate", "batch", "--file", "inquiries.json"]);
        match cli.command {
            Command::Batch { file } => assert_eq!(file, PathBuf::from("inquiries.json")),
            _ => panic!("expected Batch command"),
        }
    }

    #[test]
    fn verbose_help_describes_log_level() {
        let cmd = Cli::command();
        let verbose = cmd
            .get_arguments()
            .find(|a| a.get_id() == "verbose")
            .unwrap();
        let help = verbose.get_help().unwrap().to_string();
        assert!(help.contains("debug"), "{help}");
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
