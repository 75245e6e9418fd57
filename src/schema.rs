//! Declarative form schemas shared by the wizard and the HTTP handlers.
//!
//! A schema is an ordered list of steps; each step owns a set of fields and
//! every field carries an ordered list of rules. Validation reports the first
//! violated rule per field (see [`crate::validation`]).

/// Option id that marks "something else" in a multi-select and unlocks a free-text companion.
pub const OTHER_CUSTOM: &str = "other-custom";

/// Fixed daily booking slots.
pub const TIME_SLOTS: &[&str] = &["09:00", "10:00", "11:00", "13:00", "14:00", "15:00", "16:00"];

pub const LEGACY_ENVIRONMENTS: &[&str] = &[
    "mainframe",
    "as400",
    "legacy-erp",
    "custom-legacy",
    "client-server",
    "other",
];

pub const URGENCY_LEVELS: &[&str] = &["immediate", "within-3-months", "within-6-months", "exploring"];

/// A single constraint on one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    /// Text must be present and non-blank.
    Required,
    /// Text, when present, must look like an email address.
    Email,
    /// Text, when present, must parse as a phone number.
    Phone,
    /// Text, when present, must have at least this many characters.
    MinLen(usize),
    /// Text, when present, must have at most this many characters.
    MaxLen(usize),
    /// Multi-select must hold at least this many options.
    MinChoices(usize),
    /// Flag must be true.
    Accepted,
    /// Text, when present, must be one of the listed values.
    OneOf(&'static [&'static str]),
    /// Text is required when `field` holds `option` (as a selected choice or as its value).
    RequiredWhen {
        field: &'static str,
        option: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub check: Check,
    pub message: &'static str,
}

const fn rule(check: Check, message: &'static str) -> Rule {
    Rule { check, message }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

#[derive(Debug, Clone, Copy)]
pub struct StepSchema {
    pub title: &'static str,
    pub fields: &'static [FieldRule],
}

/// Free-text field that only makes sense while `parent` holds `option`.
#[derive(Debug, Clone, Copy)]
pub struct OtherText {
    pub parent: &'static str,
    pub option: &'static str,
    pub text_field: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct FormSchema {
    pub name: &'static str,
    pub steps: &'static [StepSchema],
    pub other_texts: &'static [OtherText],
}

impl FormSchema {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns the schema of a 1-based step.
    pub fn step(&self, step: usize) -> Option<&'static StepSchema> {
        step.checked_sub(1).and_then(|idx| self.steps.get(idx))
    }

    /// Finds the 1-based step owning `field`.
    pub fn step_of(&self, field: &str) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.fields.iter().any(|f| f.field == field))
            .map(|idx| idx + 1)
    }

    /// Companion text fields tied to `parent`.
    pub fn other_texts_for<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a OtherText> {
        self.other_texts.iter().filter(move |o| o.parent == parent)
    }
}

const NAME: FieldRule = FieldRule {
    field: "name",
    rules: &[rule(Check::Required, "Name is required")],
};

const EMAIL: FieldRule = FieldRule {
    field: "email",
    rules: &[
        rule(Check::Required, "Email is required"),
        rule(Check::Email, "Please enter a valid email address"),
    ],
};

const OPTIONAL_PHONE: FieldRule = FieldRule {
    field: "phone",
    rules: &[rule(Check::Phone, "Please enter a valid phone number")],
};

pub const ASSESSMENT: FormSchema = FormSchema {
    name: "assessment",
    steps: &[
        StepSchema {
            title: "Company Profile",
            fields: &[
                FieldRule {
                    field: "company",
                    rules: &[rule(Check::Required, "Company name is required")],
                },
                FieldRule {
                    field: "industry",
                    rules: &[rule(Check::Required, "Please select your industry")],
                },
                FieldRule {
                    field: "companySize",
                    rules: &[],
                },
                FieldRule {
                    field: "annualRevenue",
                    rules: &[],
                },
            ],
        },
        StepSchema {
            title: "Current Systems",
            fields: &[
                FieldRule {
                    field: "currentSystems",
                    rules: &[rule(Check::MinChoices(1), "Select at least one system")],
                },
                FieldRule {
                    field: "otherSystem",
                    rules: &[rule(
                        Check::RequiredWhen {
                            field: "currentSystems",
                            option: OTHER_CUSTOM,
                        },
                        "Please describe your other system",
                    )],
                },
            ],
        },
        StepSchema {
            title: "Business Goals",
            fields: &[
                FieldRule {
                    field: "businessGoals",
                    rules: &[rule(Check::MinChoices(1), "Select at least one goal")],
                },
                FieldRule {
                    field: "otherGoal",
                    rules: &[rule(
                        Check::RequiredWhen {
                            field: "businessGoals",
                            option: OTHER_CUSTOM,
                        },
                        "Please describe your other goal",
                    )],
                },
            ],
        },
        StepSchema {
            title: "Challenges & Timeline",
            fields: &[
                FieldRule {
                    field: "challenges",
                    rules: &[rule(Check::MinChoices(1), "Select at least one challenge")],
                },
                FieldRule {
                    field: "otherChallenge",
                    rules: &[rule(
                        Check::RequiredWhen {
                            field: "challenges",
                            option: OTHER_CUSTOM,
                        },
                        "Please describe your other challenge",
                    )],
                },
                FieldRule {
                    field: "timeline",
                    rules: &[rule(Check::Required, "Please select a timeline")],
                },
                FieldRule {
                    field: "budget",
                    rules: &[],
                },
                FieldRule {
                    field: "additionalInfo",
                    rules: &[rule(
                        Check::MaxLen(5000),
                        "Additional information must be 5000 characters or fewer",
                    )],
                },
            ],
        },
        StepSchema {
            title: "Contact Information",
            fields: &[
                NAME,
                EMAIL,
                OPTIONAL_PHONE,
                FieldRule {
                    field: "jobTitle",
                    rules: &[],
                },
                FieldRule {
                    field: "consent",
                    rules: &[rule(Check::Accepted, "You must agree to be contacted")],
                },
            ],
        },
    ],
    other_texts: &[
        OtherText {
            parent: "currentSystems",
            option: OTHER_CUSTOM,
            text_field: "otherSystem",
        },
        OtherText {
            parent: "businessGoals",
            option: OTHER_CUSTOM,
            text_field: "otherGoal",
        },
        OtherText {
            parent: "challenges",
            option: OTHER_CUSTOM,
            text_field: "otherChallenge",
        },
    ],
};

pub const INTAKE: FormSchema = FormSchema {
    name: "intake",
    steps: &[
        StepSchema {
            title: "About You",
            fields: &[
                NAME,
                EMAIL,
                OPTIONAL_PHONE,
                FieldRule {
                    field: "company",
                    rules: &[rule(Check::Required, "Company name is required")],
                },
                FieldRule {
                    field: "jobTitle",
                    rules: &[],
                },
            ],
        },
        StepSchema {
            title: "Current Environment",
            fields: &[
                FieldRule {
                    field: "legacyEnvironment",
                    rules: &[
                        rule(Check::Required, "Please select your current environment"),
                        rule(
                            Check::OneOf(LEGACY_ENVIRONMENTS),
                            "Please select a valid environment",
                        ),
                    ],
                },
                FieldRule {
                    field: "otherEnvironment",
                    rules: &[rule(
                        Check::RequiredWhen {
                            field: "legacyEnvironment",
                            option: "other",
                        },
                        "Please describe your environment",
                    )],
                },
            ],
        },
        StepSchema {
            title: "Modernization Goals",
            fields: &[
                FieldRule {
                    field: "modernizationGoals",
                    rules: &[rule(Check::MinChoices(1), "Select at least one modernization goal")],
                },
                FieldRule {
                    field: "otherGoal",
                    rules: &[rule(
                        Check::RequiredWhen {
                            field: "modernizationGoals",
                            option: OTHER_CUSTOM,
                        },
                        "Please describe your other goal",
                    )],
                },
                FieldRule {
                    field: "urgency",
                    rules: &[
                        rule(Check::Required, "Please select how urgent this is"),
                        rule(Check::OneOf(URGENCY_LEVELS), "Please select a valid urgency"),
                    ],
                },
            ],
        },
    ],
    other_texts: &[
        OtherText {
            parent: "legacyEnvironment",
            option: "other",
            text_field: "otherEnvironment",
        },
        OtherText {
            parent: "modernizationGoals",
            option: OTHER_CUSTOM,
            text_field: "otherGoal",
        },
    ],
};

pub const CONTACT: FormSchema = FormSchema {
    name: "contact",
    steps: &[StepSchema {
        title: "Contact",
        fields: &[NAME, EMAIL, OPTIONAL_PHONE],
    }],
    other_texts: &[],
};

pub const GENERAL_CONTACT: FormSchema = FormSchema {
    name: "general-contact",
    steps: &[StepSchema {
        title: "Message",
        fields: &[
            NAME,
            EMAIL,
            OPTIONAL_PHONE,
            FieldRule {
                field: "message",
                rules: &[
                    rule(Check::Required, "Message is required"),
                    rule(Check::MinLen(10), "Message must be at least 10 characters"),
                    rule(Check::MaxLen(5000), "Message must be 5000 characters or fewer"),
                ],
            },
        ],
    }],
    other_texts: &[],
};

pub const BOOKING: FormSchema = FormSchema {
    name: "booking",
    steps: &[StepSchema {
        title: "Booking",
        fields: &[
            NAME,
            EMAIL,
            FieldRule {
                field: "phone",
                rules: &[
                    rule(Check::Required, "Phone is required"),
                    rule(Check::Phone, "Please enter a valid phone number"),
                ],
            },
            FieldRule {
                field: "company",
                rules: &[rule(Check::Required, "Company name is required")],
            },
            FieldRule {
                field: "date",
                rules: &[rule(Check::Required, "Please select a date")],
            },
            FieldRule {
                field: "timeSlot",
                rules: &[
                    rule(Check::Required, "Please select a time slot"),
                    rule(Check::OneOf(TIME_SLOTS), "Please select a valid time slot"),
                ],
            },
        ],
    }],
    other_texts: &[],
};

pub const NEWSLETTER: FormSchema = FormSchema {
    name: "newsletter",
    steps: &[StepSchema {
        title: "Newsletter",
        fields: &[EMAIL],
    }],
    other_texts: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assessment_has_five_steps() {
        assert_eq!(ASSESSMENT.step_count(), 5);
        assert_eq!(ASSESSMENT.step(1).map(|s| s.title), Some("Company Profile"));
        assert!(ASSESSMENT.step(0).is_none());
        assert!(ASSESSMENT.step(6).is_none());
    }

    #[test]
    fn test_step_of_field() {
        assert_eq!(ASSESSMENT.step_of("industry"), Some(1));
        assert_eq!(ASSESSMENT.step_of("otherGoal"), Some(3));
        assert_eq!(ASSESSMENT.step_of("consent"), Some(5));
        assert_eq!(INTAKE.step_of("urgency"), Some(3));
        assert_eq!(ASSESSMENT.step_of("recaptchaToken"), None);
    }

    #[test]
    fn test_other_texts_for_parent() {
        let linked: Vec<_> = ASSESSMENT
            .other_texts_for("businessGoals")
            .map(|o| o.text_field)
            .collect();
        assert_eq!(linked, vec!["otherGoal"]);
        assert_eq!(ASSESSMENT.other_texts_for("industry").count(), 0);
    }
}
