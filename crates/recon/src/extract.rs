use std::collections::HashSet;

use regex::Regex;
use tracing::debug;

use crate::config::DocumentPolicy;
use crate::error::ReconError;
use crate::model::CreditRequirement;

/// Matches `<category> <required marker>[:：]<n> <elective marker>[:：]<m>`.
pub fn requirement_pattern(policy: &DocumentPolicy) -> Result<Regex, ReconError> {
    let pattern = format!(
        r"(.*?)\s*{}[:：]\s*([0-9０-９]+)\s*{}[:：]\s*([0-9０-９]+)",
        regex::escape(&policy.required_marker),
        regex::escape(&policy.elective_marker),
    );
    Regex::new(&pattern).map_err(|e| ReconError::PolicyValidation(e.to_string()))
}

/// Scan paragraphs for credit-threshold sentences.
///
/// Output is in first-seen order, one entry per category. Paragraphs that
/// mention a marker but do not match the full pattern are skipped.
pub fn extract_requirements<S: AsRef<str>>(
    paragraphs: &[S],
    policy: &DocumentPolicy,
) -> Result<Vec<CreditRequirement>, ReconError> {
    let re = requirement_pattern(policy)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for text in paragraphs.iter().map(AsRef::as_ref) {
        if !text.contains(policy.required_marker.as_str())
            && !text.contains(policy.elective_marker.as_str())
        {
            continue;
        }

        let Some(caps) = re.captures(text) else {
            debug!(paragraph = text, "credit marker present but pattern did not match");
            continue;
        };

        let category = caps[1].trim().to_string();
        let (Some(required), Some(elective)) = (parse_count(&caps[2]), parse_count(&caps[3])) else {
            debug!(paragraph = text, "credit count out of range");
            continue;
        };

        if !seen.insert(category.clone()) {
            debug!(category = %category, "duplicate credit requirement ignored");
            continue;
        }

        out.push(CreditRequirement::new(category, required, elective));
    }

    Ok(out)
}

/// Full-width digits read as ASCII. `None` on overflow.
fn parse_count(digits: &str) -> Option<u32> {
    digits.chars().try_fold(0u32, |acc, c| {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '０'..='９' => c as u32 - '０' as u32,
            _ => return None,
        };
        acc.checked_mul(10)?.checked_add(digit)
    })
}
