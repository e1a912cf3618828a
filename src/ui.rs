//! Interface de terminal: spinner por execução e saída colorida.
//!
//! Usa `indicatif` para o spinner e `console` para as cores. O
//! [`WorkflowProgress`] acompanha uma inquiry do FETCHING até o estado terminal.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::workflow::{MAX_DRAFT_ATTEMPTS, RunAudit, SupportReply, WorkflowRecord, WorkflowState};

/// Spinner e mensagens coloridas para uma execução do fluxo.
///
/// Verde para ACCEPTED, vermelho para ESCALATED, amarelo para nova tentativa.
pub struct WorkflowProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl WorkflowProgress {
    pub fn start(order_id: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        // Template literal; falhar aqui só deixa o estilo padrão.
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Order {order_id}: starting"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Chamado depois de cada transição.
    pub fn observe(&self, record: &WorkflowRecord) {
        if record.state == WorkflowState::Retrying {
            let feedback = record.compliance_feedback.as_deref().unwrap_or("");
            self.pb.println(format!(
                "  {} Draft {}/{MAX_DRAFT_ATTEMPTS} rejected: {feedback}",
                self.yellow.apply_to("↻"),
                record.retry_count
            ));
        }
        self.pb
            .set_message(format!("Order {}: {}", record.order_id, record.state));
    }

    /// Para o spinner e mostra o resultado.
    pub fn complete(&self, record: &WorkflowRecord) {
        self.pb.finish_and_clear();
        match record.state {
            WorkflowState::Accepted => println!(
                "  {} Reply accepted after {} draft(s)",
                self.green.apply_to("✓"),
                record.retry_count
            ),
            _ => println!(
                "  {} Escalated to a human agent after {} draft(s)",
                self.red.apply_to("✗"),
                record.retry_count
            ),
        }
    }

    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }

    /// Resposta final, seguida da trilha de passos em cinza.
    pub fn print_reply(&self, reply: &SupportReply) {
        println!();
        println!("  Category: {}", reply.category);
        println!("  Compliance checked: {}", reply.compliance_checked);
        println!();
        println!("{}", reply.final_response);
        println!();
        for line in &reply.logs {
            println!("  {}", self.dim.apply_to(line));
        }
    }

    /// Imprime o resumo da execução em JSON.
    pub fn print_audit(&self, audit: &RunAudit) {
        let style = match audit.outcome {
            WorkflowState::Accepted => &self.green,
            WorkflowState::Escalated => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", style.apply_to("─── Run Audit ───"));
        println!("{}", serde_json::to_string_pretty(audit).unwrap_or_default());
    }
}
