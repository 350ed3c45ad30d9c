//! Survey question catalogue.
//!
//! Every survey-derived column the analysis understands is enumerated here:
//! one "answered" flag per question plus one binary flag per answer option.
//! Columns are resolved by exact lookup, so overlapping prefixes cannot
//! attribute an option to the wrong question.

use serde::{Deserialize, Serialize};

/// A single answer option and the binary column that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyOption {
    pub column: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyQuestion {
    InternetUse,
    SocialMedia,
    PersonalDetails,
    PasswordStorage,
    ScamVictim,
    AccountHacked,
}

const INTERNET_USE_OPTIONS: &[SurveyOption] = &[
    SurveyOption { column: "use_the_internet_for_1", label: "Social media" },
    SurveyOption { column: "use_the_internet_for_2", label: "Banking & Finance" },
    SurveyOption { column: "use_the_internet_for_3", label: "Online shopping" },
    SurveyOption { column: "use_the_internet_for_4", label: "Gaming" },
    SurveyOption { column: "use_the_internet_for_5", label: "Streaming" },
    SurveyOption { column: "use_the_internet_for_6", label: "Research & Education" },
];

const SOCIAL_MEDIA_OPTIONS: &[SurveyOption] = &[
    SurveyOption { column: "do_on_social_media_1", label: "News/Events" },
    SurveyOption { column: "do_on_social_media_2", label: "Post Photos" },
    SurveyOption { column: "do_on_social_media_3", label: "Entertainment" },
    SurveyOption { column: "do_on_social_media_4", label: "Brand Research" },
];

const PERSONAL_DETAILS_OPTIONS: &[SurveyOption] = &[
    SurveyOption { column: "enter_personal_details_online_1", label: "Credit Card" },
    SurveyOption { column: "enter_personal_details_online_2", label: "Phone Number" },
    SurveyOption { column: "enter_personal_details_online_3", label: "Passport" },
    SurveyOption { column: "enter_personal_details_online_4", label: "Date of Birth" },
    SurveyOption { column: "enter_personal_details_online_5", label: "Address" },
    SurveyOption { column: "enter_personal_details_online_6", label: "SSN" },
];

const PASSWORD_STORAGE_OPTIONS: &[SurveyOption] = &[
    SurveyOption { column: "keep_your_passwords_1", label: "Notepad" },
    SurveyOption { column: "keep_your_passwords_2", label: "Computer" },
    SurveyOption { column: "keep_your_passwords_3", label: "Password Manager" },
    SurveyOption { column: "keep_your_passwords_4", label: "Remember Mentally" },
];

const SCAM_VICTIM_OPTIONS: &[SurveyOption] = &[
    SurveyOption { column: "victim_of_online_scam_1", label: "No" },
    SurveyOption { column: "victim_of_online_scam_2", label: "Yes" },
];

const ACCOUNT_HACKED_OPTIONS: &[SurveyOption] = &[
    SurveyOption { column: "nline_accounts_hacked_1", label: "No" },
    SurveyOption { column: "nline_accounts_hacked_2", label: "Yes" },
];

impl SurveyQuestion {
    pub const ALL: [SurveyQuestion; 6] = [
        SurveyQuestion::InternetUse,
        SurveyQuestion::SocialMedia,
        SurveyQuestion::PersonalDetails,
        SurveyQuestion::PasswordStorage,
        SurveyQuestion::ScamVictim,
        SurveyQuestion::AccountHacked,
    ];

    /// Column prefix shared by this question's flags in the normalized table.
    pub fn column_prefix(&self) -> &'static str {
        match self {
            Self::InternetUse => "use_the_internet_for_",
            Self::SocialMedia => "do_on_social_media_",
            Self::PersonalDetails => "enter_personal_details_online_",
            Self::PasswordStorage => "keep_your_passwords_",
            Self::ScamVictim => "victim_of_online_scam_",
            // Upstream export truncates the leading "o".
            Self::AccountHacked => "nline_accounts_hacked_",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::InternetUse => "What do you use the internet for?",
            Self::SocialMedia => "What do you do on social media?",
            Self::PersonalDetails => "Do you enter personal details online?",
            Self::PasswordStorage => "How do you keep your passwords?",
            Self::ScamVictim => "Victim of online scam?",
            Self::AccountHacked => "Account hacked before?",
        }
    }

    /// The "answered at least one option" flag column.
    pub fn answered_column(&self) -> &'static str {
        match self {
            Self::InternetUse => "use_the_internet_for_answered",
            Self::SocialMedia => "do_on_social_media_answered",
            Self::PersonalDetails => "enter_personal_details_online_answered",
            Self::PasswordStorage => "keep_your_passwords_answered",
            Self::ScamVictim => "victim_of_online_scam_answered",
            Self::AccountHacked => "nline_accounts_hacked_answered",
        }
    }

    /// Display name of the answered flag in grouped rankings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::InternetUse => "Internet Usage",
            Self::SocialMedia => "Social Media Activity",
            Self::PersonalDetails => "Personal Details Sharing",
            Self::PasswordStorage => "Password Management",
            Self::ScamVictim => "Past Scam Victim",
            Self::AccountHacked => "Account Hacking History",
        }
    }

    pub fn options(&self) -> &'static [SurveyOption] {
        match self {
            Self::InternetUse => INTERNET_USE_OPTIONS,
            Self::SocialMedia => SOCIAL_MEDIA_OPTIONS,
            Self::PersonalDetails => PERSONAL_DETAILS_OPTIONS,
            Self::PasswordStorage => PASSWORD_STORAGE_OPTIONS,
            Self::ScamVictim => SCAM_VICTIM_OPTIONS,
            Self::AccountHacked => ACCOUNT_HACKED_OPTIONS,
        }
    }

    /// Resolve an option column to its question and option entry.
    pub fn for_option(column: &str) -> Option<(SurveyQuestion, SurveyOption)> {
        Self::ALL.iter().find_map(|question| {
            question
                .options()
                .iter()
                .find(|option| option.column == column)
                .map(|option| (*question, *option))
        })
    }

    /// Resolve an answered-flag column to its question.
    pub fn for_answered(column: &str) -> Option<SurveyQuestion> {
        Self::ALL
            .iter()
            .copied()
            .find(|question| question.answered_column() == column)
    }

    /// Whether the column looks like it belongs to a question without being
    /// in the catalogue.
    pub fn shares_prefix(column: &str) -> bool {
        Self::ALL
            .iter()
            .any(|question| column.starts_with(question.column_prefix()))
    }

    /// Every option column across all questions, in catalogue order.
    pub fn all_option_columns() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .into_iter()
            .flat_map(|question| question.options().iter().map(|option| option.column))
    }
}
