//! The guided questionnaire: a fixed, ordered list of steps.

use super::model::LeadField;

/// One scripted question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: &'static str,
    pub prompt: &'static str,
    /// Lead field the answer is stored under.
    pub field: Option<LeadField>,
    /// Quick-reply choices shown under the prompt; empty means free text.
    pub options: &'static [&'static str],
}

impl StepDefinition {
    pub fn options(&self) -> Vec<String> {
        self.options.iter().map(|s| s.to_string()).collect()
    }
}

/// The Realtech questionnaire, one step per lead field.
pub static REALTECH_STEPS: [StepDefinition; 10] = [
    StepDefinition {
        id: "location",
        prompt: "Which city or locality are you looking for a property in?",
        field: Some(LeadField::LocationPreference),
        options: &[],
    },
    StepDefinition {
        id: "intent",
        prompt: "Are you looking to buy, rent, or invest?",
        field: Some(LeadField::Intent),
        options: &["Buy", "Rent", "Invest"],
    },
    StepDefinition {
        id: "budget",
        prompt: "What's your budget range?",
        field: Some(LeadField::Budget),
        options: &["Under 50L", "50L - 1Cr", "1Cr - 2Cr", "Above 2Cr"],
    },
    StepDefinition {
        id: "property_type",
        prompt: "What type of property are you interested in?",
        field: Some(LeadField::PropertyType),
        options: &["Apartment", "Villa", "Plot", "Independent House", "Commercial"],
    },
    StepDefinition {
        id: "bedrooms",
        prompt: "How many bedrooms do you need?",
        field: Some(LeadField::Bedrooms),
        options: &["1 BHK", "2 BHK", "3 BHK", "4+ BHK"],
    },
    StepDefinition {
        id: "special_preferences",
        prompt: "Any special preferences? For example pet-friendly, gated community, or close to schools.",
        field: Some(LeadField::SpecialPreferences),
        options: &[],
    },
    StepDefinition {
        id: "move_in",
        prompt: "When are you planning to move in?",
        field: Some(LeadField::MoveInTimeline),
        options: &["Immediately", "Within 3 months", "3-6 months", "6+ months"],
    },
    StepDefinition {
        id: "builders",
        prompt: "Do you have any preferred builders or developers?",
        field: Some(LeadField::PreferredBuilders),
        options: &["No preference"],
    },
    StepDefinition {
        id: "site_visit",
        prompt: "When would you like to schedule a site visit?",
        field: Some(LeadField::VisitTimeline),
        options: &["This week", "Next week", "This month", "Just browsing"],
    },
    StepDefinition {
        id: "contact",
        prompt: "Finally, how can our team reach you? Please share your name and phone number or email.",
        field: Some(LeadField::ContactDetails),
        options: &[],
    },
];
