use syncpro_core::Exchange;

/// File name offered for a transcript download.
pub const EXPORT_FILE_NAME: &str = "chat_history.txt";

/// Renders the transcript as numbered question/answer blocks separated by a
/// blank line.
///
/// Callers check for an empty transcript first; an empty slice renders as an
/// empty string.
pub fn render(exchanges: &[Exchange]) -> String {
    exchanges
        .iter()
        .enumerate()
        .map(|(i, ex)| {
            let n = i + 1;
            format!(
                "Q{n} (lang: {}): {}\nA{n} ({}): {}\n",
                ex.language, ex.question, ex.model_label, ex.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
