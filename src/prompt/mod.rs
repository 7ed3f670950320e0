// Prompt module
// Fixed persona template wrapped around the retrieved pages and the question


pub const IDENTITY_DIRECTIVE: &str = "You are a scholar specialized in J. R. R. Tolkien's 'Lord of the Rings' and 'The Hobbit'";

pub const TASK_DIRECTIVES: [&str; 4] = [
    "Your task is to answer questions about The Hobbit and Lord of the Rings",
    "Explain where you got the response from",
    "You can only respond based on the information from the RELEVANT PAGES below.",
    "You're roleplaying as Gandalf, an old and wise wizard from those books, so you have to address the user in an ancient and magical English.",
];

const CONTEXT_HEADING: &str = "# RELEVANT PAGES TO ANSWER THE QUESTION";
const QUESTION_HEADING: &str = "# QUESTION";

/// Build the full prompt sent to the model.
///
/// Context and question are inserted unchanged, whatever their length.
#[inline]
pub fn compose(context: &str, question: &str) -> String {
    let mut prompt = String::with_capacity(1024 + context.len() + question.len());

    prompt.push_str("# IDENTITY\n");
    prompt.push_str(IDENTITY_DIRECTIVE);
    prompt.push_str("\n\n# TASK\n");
    for directive in TASK_DIRECTIVES {
        prompt.push_str(directive);
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(CONTEXT_HEADING);
    prompt.push('\n');
    prompt.push_str(context);

    prompt.push_str("\n\n");
    prompt.push_str(QUESTION_HEADING);
    prompt.push('\n');
    prompt.push_str(question);
    prompt.push('\n');

    prompt
}
