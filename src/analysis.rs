use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Analysis, Impact, Misconception, SolutionStep};

/// new_analysis_id
///
/// Builds an id of the form `analysis_<unix-millis>_<7 lowercase alphanumerics>`.
pub fn new_analysis_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(7).collect();
    format!("analysis_{}_{}", now.timestamp_millis(), suffix)
}

/// mock_analysis
///
/// Stand-in for the AI grader. Always returns the same worked example (a linear equation
/// with an arithmetic slip in step 3 that carries into step 4), stamped with the uploader
/// and file name.
pub fn mock_analysis(user_id: &str, filename: &str, now: DateTime<Utc>) -> Analysis {
    let steps = vec![
        SolutionStep {
            step: 1,
            content: "2x + 5 = 15".to_string(),
            is_correct: true,
            explanation: "Initial equation".to_string(),
            correction: None,
        },
        SolutionStep {
            step: 2,
            content: "2x = 15 - 5".to_string(),
            is_correct: true,
            explanation: "Subtract 5 from both sides".to_string(),
            correction: None,
        },
        SolutionStep {
            step: 3,
            content: "2x = 9".to_string(),
            is_correct: false,
            explanation: "Calculation error: 15 - 5 = 10, not 9".to_string(),
            correction: Some("2x = 10".to_string()),
        },
        SolutionStep {
            step: 4,
            content: "x = 9/2 = 4.5".to_string(),
            is_correct: false,
            explanation: "This follows from the previous error. The correct value should be x = 10/2 = 5"
                .to_string(),
            correction: Some("x = 10/2 = 5".to_string()),
        },
    ];

    let misconceptions = vec![Misconception {
        kind: "calculation".to_string(),
        description: "Calculation error in subtraction".to_string(),
        step: 3,
        impact: Impact::High,
    }];

    Analysis {
        user_id: user_id.to_string(),
        filename: filename.to_string(),
        timestamp: now,
        problem: "Solve for x: 2x + 5 = 15".to_string(),
        steps,
        misconceptions,
        summary: "The solution contains a calculation error in step 3, where 15 - 5 was \
                  incorrectly calculated as 9 instead of 10. This led to an incorrect final \
                  answer of x = 4.5, when the correct answer is x = 5."
            .to_string(),
        overall_feedback: "Be careful with basic arithmetic operations. Double-check your \
                           calculations, especially when working with negative numbers or \
                           fractions."
            .to_string(),
    }
}
