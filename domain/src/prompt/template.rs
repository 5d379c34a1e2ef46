//! Prompt templates for the coordinator and the workers

/// Templates for the instructions given to the decision oracle
pub struct PromptTemplate;

impl PromptTemplate {
    /// Routing-policy instruction for the coordinator.
    ///
    /// Lists the workers by name so the oracle can address `ask_worker`
    /// calls, and states when to stop routing and answer in plain text.
    pub fn routing_policy(worker_names: &[String]) -> String {
        format!(
            r#"You are an agent manager.
You will receive a new feature request from the user.
Your job is to organize the discussion between the worker agents.
Formulate the questions to the workers to gather their feedback on this new feature.

Available workers: {}

On every turn, either call one of the routing tools:
- ask_worker: question a single worker by name
- ask_all_workers: ask every worker the same question and wait for all answers
- ask_user: ask the human user for clarification
or, once the discussion has produced enough feedback, reply in plain text with
the final summary for the user. A plain-text reply ends the discussion."#,
            worker_names.join(", ")
        )
    }

    /// Role instruction for every worker
    pub fn worker_role() -> &'static str {
        r#"You are a worker agent.
The user has submitted a request for a new feature.
The Manager agent requires your help.
Answer any questions from the Manager agent."#
    }
}
