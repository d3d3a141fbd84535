use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutcome {
    pub applied: usize,
    pub skipped: Vec<String>,
}

impl Page {
    pub fn process_response(&mut self, text: &str) -> Result<ProcessOutcome> {
        let envelope = Envelope::parse(text)?;
        self.process_envelope(&envelope)
    }

    // Instructions apply in document order. A component whose target id is
    // absent is skipped and processing continues; a failing evaluate stops
    // the pass. Nothing already applied is rolled back.
    pub fn process_envelope(&mut self, envelope: &Envelope) -> Result<ProcessOutcome> {
        let mut outcome = ProcessOutcome::default();

        for instruction in &envelope.instructions {
            match instruction {
                Instruction::Component { id, markup } => match self.dom.by_id(id) {
                    None => {
                        self.trace_ajax_line(format!(
                            "[ajax] component id={id} target not found, skipped"
                        ));
                        outcome.skipped.push(id.clone());
                    }
                    Some(node) => {
                        self.dom.set_inner_html(node, markup)?;
                        outcome.applied += 1;
                        self.trace_ajax_line(format!(
                            "[ajax] component id={id} replaced ({} chars)",
                            markup.chars().count()
                        ));
                    }
                },
                Instruction::Evaluate { script } => {
                    self.exec_script_source(script)?;
                    outcome.applied += 1;
                    self.trace_ajax_line(format!(
                        "[ajax] evaluate ran ({} chars)",
                        script.chars().count()
                    ));
                }
            }
        }

        self.trace_ajax_line(format!(
            "[ajax] envelope processed applied={} skipped={}",
            outcome.applied,
            outcome.skipped.len()
        ));
        Ok(outcome)
    }
}
