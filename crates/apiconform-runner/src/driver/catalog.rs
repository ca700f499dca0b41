//! The fixed set of endpoint tests, in execution order.

use apiconform_core::CaseValue;

use crate::verify::{EndpointCall, QueryParams};

/// One named test: a group of steps sharing a resource.
#[derive(Debug)]
pub struct TestPlan {
    pub test: &'static str,
    pub steps: &'static [Step],
}

/// One case set run against one endpoint shape.
#[derive(Debug)]
pub struct Step {
    /// Config case name supplying the values
    pub case: &'static str,
    pub label: &'static str,
    pub endpoint: Endpoint,
    pub expected_status: u16,
    /// Schema definition the body is checked against
    pub resource: &'static str,
    pub nullable: &'static [&'static str],
    pub assertion: Assertion,
    /// Skipped with a warning when the configuration lacks the case
    pub optional: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum Endpoint {
    /// `{collection}/{value}`
    ById(&'static str),
    /// `{path}?{param}={value}`; list values repeat the key
    Query {
        path: &'static str,
        param: &'static str,
    },
}

/// Business rule applied to the payload of a conforming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assertion {
    None,
    /// `data.id` equals the requested id
    IdEcho,
    /// Non-empty, every `attributes.<field>` equals the value
    Equals(&'static str),
    /// Non-empty, every `attributes.<field>` is at least the value
    AtLeast(&'static str),
    /// Non-empty, every `attributes.<field>` is at most the value
    AtMost(&'static str),
    /// Non-empty, every `attributes.<field>` is one of the values
    MemberOf(&'static str),
    /// Non-empty, every `attributes.<field>` is the same calendar date
    SameDate(&'static str),
}

impl Step {
    /// Build the endpoint call for one configured value.
    #[must_use]
    pub fn call(&self, value: &CaseValue) -> EndpointCall {
        let call = match self.endpoint {
            Endpoint::ById(collection) => EndpointCall::new(
                format!("{collection}/{}", value.as_text()),
                self.resource,
                self.expected_status,
            ),
            Endpoint::Query { path, param } => {
                EndpointCall::new(path, self.resource, self.expected_status)
                    .with_query(QueryParams::new().with(param, value.query_values()))
            }
        };
        call.with_nullable(self.nullable)
    }

    const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }
}

const DEVELOPER: &str = "DeveloperResource";
const GAME: &str = "GameResource";
const REVIEW: &str = "ReviewResource";
const ERROR: &str = "Error";

const GAME_NULLABLE: &[&str] = &["score"];

const fn by_id(
    case: &'static str,
    label: &'static str,
    collection: &'static str,
    expected_status: u16,
    resource: &'static str,
    nullable: &'static [&'static str],
    assertion: Assertion,
) -> Step {
    Step {
        case,
        label,
        endpoint: Endpoint::ById(collection),
        expected_status,
        resource,
        nullable,
        assertion,
        optional: false,
    }
}

#[allow(clippy::too_many_arguments)]
const fn query(
    case: &'static str,
    label: &'static str,
    path: &'static str,
    param: &'static str,
    expected_status: u16,
    resource: &'static str,
    nullable: &'static [&'static str],
    assertion: Assertion,
) -> Step {
    Step {
        case,
        label,
        endpoint: Endpoint::Query { path, param },
        expected_status,
        resource,
        nullable,
        assertion,
        optional: false,
    }
}

#[rustfmt::skip]
pub const CATALOG: &[TestPlan] = &[
    TestPlan {
        test: "test_get_developer_by_id",
        steps: &[
            by_id("valid_developer_ids", "valid developer ids", "/developers", 200, DEVELOPER, &[], Assertion::IdEcho),
            by_id("non_existant_developer_ids", "non existent developer ids", "/developers", 404, ERROR, &[], Assertion::None),
            by_id("invalid_developer_ids", "invalid developer ids", "/developers", 400, ERROR, &[], Assertion::None).optional(),
        ],
    },
    TestPlan {
        test: "test_get_developers",
        steps: &[
            query("developer_names", "name query parameter", "/developers", "name", 200, DEVELOPER, &[], Assertion::Equals("name")),
        ],
    },
    TestPlan {
        test: "test_get_games_by_id",
        steps: &[
            by_id("valid_game_ids", "valid game ids", "/games", 200, GAME, GAME_NULLABLE, Assertion::IdEcho),
            by_id("non_existant_game_ids", "non existent game ids", "/games", 404, ERROR, &[], Assertion::None),
            by_id("invalid_game_ids", "invalid game ids", "/games", 400, ERROR, &[], Assertion::None).optional(),
        ],
    },
    TestPlan {
        test: "test_get_games",
        steps: &[
            query("game_names", "name query parameter", "/games", "name", 200, GAME, GAME_NULLABLE, Assertion::Equals("name")),
            query("game_developer_ids", "developerId query parameter", "/games", "developerId", 200, GAME, GAME_NULLABLE, Assertion::Equals("developerId")),
            query("scores", "scoreMin query parameter", "/games", "scoreMin", 200, GAME, GAME_NULLABLE, Assertion::AtLeast("score")),
            query("scores", "scoreMax query parameter", "/games", "scoreMax", 200, GAME, GAME_NULLABLE, Assertion::AtMost("score")),
        ],
    },
    TestPlan {
        test: "test_get_reviews_by_id",
        steps: &[
            by_id("valid_review_ids", "valid review ids", "/reviews", 200, REVIEW, &[], Assertion::IdEcho),
            by_id("non_existant_review_ids", "non existent review ids", "/reviews", 404, ERROR, &[], Assertion::None),
            by_id("invalid_review_ids", "invalid review ids", "/reviews", 400, ERROR, &[], Assertion::None).optional(),
        ],
    },
    TestPlan {
        test: "test_get_reviews",
        steps: &[
            query("reviewer_names", "reviewer query parameter", "/reviews", "reviewer", 200, REVIEW, &[], Assertion::Equals("reviewer")),
            query("review_game_ids", "gameIds query parameter", "/reviews", "gameIds", 200, REVIEW, &[], Assertion::MemberOf("gameId")),
            query("review_invalid_game_id_formats", "invalid gameIds formats", "/reviews", "gameIds", 400, ERROR, &[], Assertion::None),
            query("scores", "scoreMin query parameter", "/reviews", "scoreMin", 200, REVIEW, &[], Assertion::AtLeast("score")),
            query("scores", "scoreMax query parameter", "/reviews", "scoreMax", 200, REVIEW, &[], Assertion::AtMost("score")),
            query("review_review_dates", "reviewDate query parameter", "/reviews", "reviewDate", 200, REVIEW, &[], Assertion::SameDate("reviewDate")),
            query("review_invalid_date_formats", "invalid reviewDate formats", "/reviews", "reviewDate", 400, ERROR, &[], Assertion::None),
        ],
    },
];
