//! Prompt builders.

use std::fmt::Write as _;

use police_perf_analytics_models::{CategoryScore, DistrictComparison, PerformanceMetric, format_rate};
use police_perf_district_models::{Category, Language};

/// System prompt shared by every analyst-style request.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are an expert data analyst for a police \
    department. Respond with JSON only, matching the requested shape exactly, with no \
    commentary before or after it.";

/// System prompt for extraction requests.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert data extraction agent for a \
    police department. Respond with JSON only.";

fn category_list() -> String {
    Category::all()
        .iter()
        .map(|c| format!("{c} ({})", c.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Executive summary request over per-category KPIs and per-district totals.
#[must_use]
pub fn summary_prompt(metrics: &[PerformanceMetric], districts: &[DistrictComparison]) -> String {
    let mut prompt = String::from(
        "Provide a clear, structured analysis of the following district-level police \
         performance data, focusing on comparative insights between districts.\n\n\
         Return an object with three fields:\n\
         - \"summary\": one paragraph comparing overall performance across districts.\n\
         - \"achievements\": the 2-3 most significant positive results, naming districts \
         (e.g. \"Ganjam excelled in Narcotic Seizures with a 92% solve rate\").\n\
         - \"improvements\": the 2-3 most significant weak points, naming districts.\n\n\
         District performance:\n",
    );

    for d in districts {
        let _ = writeln!(
            prompt,
            "- {}: {} registered, {} solved, solve rate {}",
            d.name,
            d.cases_registered,
            d.cases_solved,
            format_rate(d.solve_rate)
        );
    }

    prompt.push_str("\nCategory performance:\n");
    for m in metrics {
        let _ = writeln!(
            prompt,
            "- {}: {} registered, {} solved, solve rate {} (previous month {})",
            m.label,
            m.cases_registered,
            m.cases_solved,
            format_rate(m.solve_rate),
            format_rate(m.previous_solve_rate)
        );
    }

    prompt
}

/// Translation request. The model answers with the bare translation.
#[must_use]
pub fn translate_prompt(text: &str, language: Language) -> String {
    format!(
        "Translate the following text into {}. Return an object of the form \
         {{\"translatedText\": \"...\"}}.\n\nText:\n{text}",
        language.name()
    )
}

/// Improvement-suggestion request for a district's weakest categories.
#[must_use]
pub fn suggestions_prompt(district_name: &str, worst: &[CategoryScore]) -> String {
    let mut prompt = format!(
        "You are advising the {district_name} police district. Give 3-4 concrete, \
         realistic recommendations the district can implement to improve its \
         lowest-performing areas. Return an object of the form \
         {{\"suggestions\": [\"...\"]}}.\n\nWeakest categories:\n"
    );
    for score in worst {
        let _ = writeln!(
            prompt,
            "- Category: {}, registered {}, solved {}, solve rate {}",
            score.label,
            score.cases_registered,
            score.cases_solved,
            format_rate(score.solve_rate)
        );
    }
    prompt
}

fn extraction_rules(today: &str) -> String {
    format!(
        "For each record identify:\n\
         - \"District\": the police district name.\n\
         - \"Category\": one of {}. Use \"Others\" when nothing fits.\n\
         - \"Cases Registered\" and \"Cases Solved\": whole numbers. If only a single \
         value is given, put it in \"Value\" instead.\n\
         - \"Date\": YYYY-MM-DD. Infer it from surrounding context when a record has none; \
         use {today} if no date can be found.\n\n\
         Return an object of the form {{\"data\": [ {{...}}, ... ]}} with one object per \
         record.",
        category_list()
    )
}

/// Extraction request for an attached document.
#[must_use]
pub fn document_prompt(today: &str) -> String {
    format!(
        "Analyze the attached PDF and extract any tabular data that represents police \
         performance records. Column names may vary; map them to the fields below.\n\n{}",
        extraction_rules(today)
    )
}

/// Extraction request for unstructured text such as daily reports or emails.
#[must_use]
pub fn text_prompt(text: &str, today: &str) -> String {
    format!(
        "Convert the following unstructured text into structured performance records. \
         The text may be informal; extract every record it mentions.\n\n{}\n\n\
         Text:\n{text}",
        extraction_rules(today)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_every_district() {
        let districts = vec![
            DistrictComparison {
                district_id: 1,
                name: "Ganjam".to_string(),
                cases_registered: 10,
                cases_solved: 5,
                solve_rate: 50.0,
            },
            DistrictComparison {
                district_id: 2,
                name: "Cuttack".to_string(),
                cases_registered: 0,
                cases_solved: 0,
                solve_rate: 0.0,
            },
        ];
        let prompt = summary_prompt(&[], &districts);
        assert!(prompt.contains("- Ganjam: 10 registered, 5 solved"));
        assert!(prompt.contains("- Cuttack: 0 registered"));
    }

    #[test]
    fn extraction_prompts_name_all_categories() {
        let prompt = text_prompt("Ganjam NBW 12", "2024-01-31");
        assert!(prompt.contains("NBW"));
        assert!(prompt.contains("Road Accidents"));
        assert!(prompt.contains("2024-01-31"));
        assert!(prompt.ends_with("Ganjam NBW 12"));
    }

    #[test]
    fn translate_names_target_language() {
        assert!(translate_prompt("Hello", Language::Odia).contains("into Odia"));
    }
}
