//! Task templates, one per analysis type.

use crate::analysis::AnalysisType;

/// What the agent is asked to do.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTemplate {
    /// May contain `{query}`.
    pub description: &'static str,
    pub expected_output: &'static str,
}

static SUMMARY: TaskTemplate = TaskTemplate {
    description: concat!(
        "The patient asks: {query}\n",
        "Read the blood test report below and answer the question. List every marker that is ",
        "outside its reference range with its value, unit and range, then summarise what the ",
        "overall picture suggests."
    ),
    expected_output: concat!(
        "A short overview paragraph, a bullet list of out-of-range markers with plain-language ",
        "explanations, a direct answer to the question, and a closing note to discuss the results ",
        "with a clinician."
    ),
};

static NUTRITION: TaskTemplate = TaskTemplate {
    description: concat!(
        "The patient asks: {query}\n",
        "Using the blood test report below, identify markers that diet can influence and suggest ",
        "practical nutrition changes for each."
    ),
    expected_output: concat!(
        "A bullet list pairing each relevant marker with two or three concrete food or habit ",
        "suggestions, followed by any supplement notes and when to check with a clinician."
    ),
};

static EXERCISE: TaskTemplate = TaskTemplate {
    description: concat!(
        "The patient asks: {query}\n",
        "Using the blood test report below, design a four-week activity plan. Call out any marker ",
        "that limits intensity and adjust the plan for it."
    ),
    expected_output: concat!(
        "A week-by-week plan with session types, durations and intensity, a list of precautions ",
        "tied to specific markers, and a one-line motivational sign-off."
    ),
};

static VERIFICATION: TaskTemplate = TaskTemplate {
    description: concat!(
        "The user asks: {query}\n",
        "Check whether the document below is a blood test report. Begin your answer with ",
        "'Verdict: blood test report' or 'Verdict: not a blood test report'."
    ),
    expected_output: concat!(
        "The verdict line, then the evidence for it (lab, dates, analytes, units, ranges) and ",
        "any quality issues that would make the report unreliable."
    ),
};

impl TaskTemplate {
    /// The task for an analysis type.
    pub fn for_type(analysis_type: AnalysisType) -> &'static TaskTemplate {
        match analysis_type {
            AnalysisType::Summary => &SUMMARY,
            AnalysisType::Nutrition => &NUTRITION,
            AnalysisType::Exercise => &EXERCISE,
            AnalysisType::Verification => &VERIFICATION,
        }
    }
}
