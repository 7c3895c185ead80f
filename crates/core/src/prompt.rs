use crate::Turn;

pub const CONTEXT_BEGIN_MARKER: &str = "--- BEGIN CONTEXT ---";
pub const CONTEXT_END_MARKER: &str = "--- END CONTEXT ---";

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub general: String,
    pub grounded: String,
    pub no_context: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            general: "You are a helpful assistant. Answer the user's questions clearly and \
                      concisely."
                .to_string(),
            grounded: "You are an assistant that answers questions about the company's employee \
                       handbook. Use ONLY the information in the excerpts between the context \
                       markers below. If the excerpts do not contain the answer, say that you \
                       don't know instead of guessing."
                .to_string(),
            no_context: "No relevant information was found in the employee handbook or on the \
                         web for this question. Do not answer from general knowledge. Reply \
                         exactly with: \"I'm sorry, I don't know the answer to that based on the \
                         available information.\""
                .to_string(),
        }
    }
}

/// Builds the message list handed to the completion endpoint.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    templates: PromptTemplates,
}

impl PromptAssembler {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    pub fn system_prompt(
        &self,
        use_context: bool,
        retrieved_chunks: &[String],
        external_snippet: Option<&str>,
    ) -> String {
        if !use_context {
            return self.templates.general.clone();
        }

        let excerpts = retrieved_chunks
            .iter()
            .map(String::as_str)
            .chain(external_snippet)
            .filter(|excerpt| !excerpt.trim().is_empty())
            .collect::<Vec<_>>();

        if excerpts.is_empty() {
            return self.templates.no_context.clone();
        }

        format!(
            "{}\n\n{CONTEXT_BEGIN_MARKER}\n{}\n{CONTEXT_END_MARKER}",
            self.templates.grounded,
            excerpts.join("\n\n")
        )
    }

    pub fn assemble(
        &self,
        history: &[Turn],
        user_message: &str,
        use_context: bool,
        retrieved_chunks: &[String],
        external_snippet: Option<&str>,
    ) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Turn::system(self.system_prompt(
            use_context,
            retrieved_chunks,
            external_snippet,
        )));
        messages.extend(history.iter().cloned());
        messages.push(Turn::user(user_message));
        messages
    }
}
