//! Built-in tools.
//!
//! The bodies are plain string formatters: nothing is persisted and no invoice
//! or estimate leaves the process.

use crate::tool::ToolDefinition;
use schemars::JsonSchema;
use serde::Deserialize;

pub const CREATE_INVOICE: &str = "create_invoice";
pub const PROVIDE_ESTIMATE: &str = "provide_estimate";
pub const TEST_CASE_TOOL: &str = "test_case_tool";

/// Placeholder cost quoted by every estimate.
pub const ESTIMATE_COST: &str = "$500";

pub const TEST_CASE_DEFINITION: &str = "A test case is a set of conditions or variables under which a tester will determine whether a system under test satisfies requirements or works correctly.";

/// Arguments for `create_invoice`.
#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceArgs {
    pub customer_name: String,
    pub amount: f64,
    pub due_date: String,
}

/// Arguments for `provide_estimate`.
#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProvideEstimateArgs {
    /// The trade or kind of job, e.g. "Roofing".
    pub job_type: String,
    pub details: String,
}

/// Arguments for `test_case_tool`.
#[derive(Deserialize, JsonSchema, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseArgs {
    #[serde(default)]
    pub example_param: Option<String>,
}

pub fn format_invoice(args: &CreateInvoiceArgs) -> String {
    // f64's Display drops a zero fraction, so 150.0 renders as "150".
    format!(
        "Invoice created for {}, amount: ${}, due date: {}.",
        args.customer_name, args.amount, args.due_date
    )
}

pub fn format_estimate(args: &ProvideEstimateArgs) -> String {
    format!(
        "Estimate for {}: Based on the details provided ({}), the estimated cost is {}.",
        args.job_type, args.details, ESTIMATE_COST
    )
}

/// `create_invoice` with the given description.
///
/// The invoicing agent and the voice agent describe the same tool differently.
pub fn create_invoice(description: &str) -> ToolDefinition {
    ToolDefinition::new(CREATE_INVOICE, description, |args: CreateInvoiceArgs| async move {
        format_invoice(&args)
    })
}

pub fn provide_estimate() -> ToolDefinition {
    ToolDefinition::new(
        PROVIDE_ESTIMATE,
        "Provide an estimate based on the job type and details",
        |args: ProvideEstimateArgs| async move { format_estimate(&args) },
    )
}

pub fn test_case_tool() -> ToolDefinition {
    ToolDefinition::new(
        TEST_CASE_TOOL,
        "Provide information about test cases based on ISTQB standards",
        |_: TestCaseArgs| async { TEST_CASE_DEFINITION.to_string() },
    )
}
