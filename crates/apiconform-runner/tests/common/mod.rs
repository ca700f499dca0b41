//! Shared fixtures: an in-process stub of the games API and matching documents.
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use apiconform_core::{Config, RawConfig};
use serde_json::{Value, json};

pub type Handler = fn(&str, &[(String, String)]) -> (u16, String);

/// HTTP/1.1 stub answering one request per connection.
pub struct StubApi {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubApi {
    pub fn start() -> Self {
        Self::with_handler(games_api)
    }

    pub fn with_handler(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let log = Arc::clone(&log);
                std::thread::spawn(move || serve(stream, handler, &log));
            }
        });
        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Request targets (path + query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

fn serve(mut stream: TcpStream, handler: Handler, log: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
    log.lock().expect("request log").push(target.clone());

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let (status, body) = handler(path, &parse_query(query));
    let response = format!(
        "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

// ---------------------------------------------------------------------------
// The games API
// ---------------------------------------------------------------------------

fn resource(kind: &str, id: &str, attributes: Value) -> Value {
    json!({
        "id": id,
        "type": kind,
        "attributes": attributes,
        "links": {"self": format!("https://api.example.edu/v1/{kind}s/{id}")}
    })
}

pub fn developers() -> Vec<Value> {
    vec![
        resource("developer", "1", json!({"name": "Nintendo", "website": null})),
        resource("developer", "2", json!({"name": "Sega", "website": "https://sega.example"})),
    ]
}

pub fn games() -> Vec<Value> {
    vec![
        resource("game", "1", json!({"name": "Tetris", "developerId": "1", "score": 90, "releaseDate": "1984-06-06"})),
        resource("game", "2", json!({"name": "Doom", "developerId": "2", "score": null, "releaseDate": null})),
        resource("game", "3", json!({"name": "Mario", "developerId": "1", "score": 70, "releaseDate": null})),
    ]
}

pub fn reviews() -> Vec<Value> {
    vec![
        resource("review", "1", json!({"reviewer": "Jane", "gameId": "1", "score": 80, "reviewDate": "2020-1-2"})),
        resource("review", "2", json!({"reviewer": "Bob", "gameId": "3", "score": 60, "reviewDate": "2021-05-06"})),
    ]
}

pub fn error(status: u16, title: &str, detail: &str) -> (u16, String) {
    let body = json!({"errors": [{
        "status": status.to_string(),
        "title": title,
        "code": format!("1{status}"),
        "detail": detail,
        "links": {"about": "https://developer.example.edu/documentation/error-reference"}
    }]});
    (status, body.to_string())
}

fn values<'a>(query: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    query
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn attr<'a>(row: &'a Value, name: &str) -> &'a Value {
    &row["attributes"][name]
}

fn parse_ymd(raw: &str) -> Option<(i32, u32, u32)> {
    let mut parts = raw.split('-');
    let y = parts.next()?.parse().ok()?;
    let m = parts.next()?.parse().ok()?;
    let d = parts.next()?.parse().ok()?;
    (parts.next().is_none() && (1..=12).contains(&m) && (1..=31).contains(&d)).then_some((y, m, d))
}

fn by_id(rows: Vec<Value>, id: &str) -> (u16, String) {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return error(400, "Bad Request", &format!("id '{id}' is not numeric"));
    }
    match rows.into_iter().find(|r| r["id"] == id) {
        Some(row) => (200, json!({"data": row}).to_string()),
        None => error(404, "Not found", &format!("no resource with id {id}")),
    }
}

fn list(rows: Vec<Value>) -> (u16, String) {
    (200, json!({"data": rows}).to_string())
}

/// Filter rows by a numeric attribute bound; `None` when the bound is malformed.
fn score_filter(rows: Vec<Value>, query: &[(String, String)]) -> Option<Vec<Value>> {
    let mut rows = rows;
    for (name, keep_at_least) in [("scoreMin", true), ("scoreMax", false)] {
        for raw in values(query, name) {
            let bound: i64 = raw.parse().ok()?;
            rows.retain(|r| match attr(r, "score").as_i64() {
                Some(score) if keep_at_least => score >= bound,
                Some(score) => score <= bound,
                None => false,
            });
        }
    }
    Some(rows)
}

fn eq_filter(rows: Vec<Value>, query: &[(String, String)], names: &[&str]) -> Vec<Value> {
    let mut rows = rows;
    for name in names {
        for wanted in values(query, name) {
            rows.retain(|r| attr(r, name).as_str() == Some(wanted));
        }
    }
    rows
}

/// Well-behaved implementation of the games API under `/v1`.
pub fn games_api(path: &str, query: &[(String, String)]) -> (u16, String) {
    let Some(rest) = path.strip_prefix("/v1") else {
        return error(404, "Not found", "unknown path");
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["developers"] => list(eq_filter(developers(), query, &["name"])),
        ["developers", id] => by_id(developers(), id),
        ["games"] => {
            let rows = eq_filter(games(), query, &["name", "developerId"]);
            match score_filter(rows, query) {
                Some(rows) => list(rows),
                None => error(400, "Bad Request", "score bounds must be integers"),
            }
        }
        ["games", id] => by_id(games(), id),
        ["reviews"] => {
            let mut rows = eq_filter(reviews(), query, &["reviewer"]);
            let game_ids = values(query, "gameIds");
            if game_ids.iter().any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit())) {
                return error(400, "Bad Request", "gameIds must be numeric");
            }
            if !game_ids.is_empty() {
                rows.retain(|r| attr(r, "gameId").as_str().is_some_and(|g| game_ids.contains(&g)));
            }
            for raw in values(query, "reviewDate") {
                let Some(wanted) = parse_ymd(raw) else {
                    return error(400, "Bad Request", "reviewDate must be YYYY-MM-DD");
                };
                rows.retain(|r| attr(r, "reviewDate").as_str().and_then(parse_ymd) == Some(wanted));
            }
            match score_filter(rows, query) {
                Some(rows) => list(rows),
                None => error(400, "Bad Request", "score bounds must be integers"),
            }
        }
        ["reviews", id] => by_id(reviews(), id),
        _ => error(404, "Not found", "unknown path"),
    }
}

// ---------------------------------------------------------------------------
// Documents and configuration
// ---------------------------------------------------------------------------

pub const SWAGGER_YAML: &str = r##"swagger: "2.0"
info:
  title: Games API
  version: "1.0"
basePath: /v1
produces:
  - application/json
paths:
  /developers:
    get:
      parameters:
        - name: name
          in: query
          type: string
      responses:
        "200":
          description: Developers
          schema:
            $ref: "#/definitions/DeveloperResource"
        "400":
          description: Bad request
          schema:
            $ref: "#/definitions/Error"
  /developers/{developerId}:
    parameters:
      - $ref: "#/parameters/developerId"
    get:
      responses:
        "200":
          description: Developer
          schema:
            $ref: "#/definitions/DeveloperResource"
        "400":
          description: Bad request
          schema:
            $ref: "#/definitions/Error"
        "404":
          description: Not found
          schema:
            $ref: "#/definitions/Error"
  /games:
    get:
      parameters:
        - {name: name, in: query, type: string}
        - {name: developerId, in: query, type: string}
        - {name: scoreMin, in: query, type: integer}
        - {name: scoreMax, in: query, type: integer}
      responses:
        "200":
          description: Games
          schema:
            $ref: "#/definitions/GameResource"
        "400":
          description: Bad request
          schema:
            $ref: "#/definitions/Error"
  /games/{gameId}:
    parameters:
      - {name: gameId, in: path, required: true, type: string}
    get:
      responses:
        "200":
          description: Game
          schema:
            $ref: "#/definitions/GameResource"
        "400":
          description: Bad request
          schema:
            $ref: "#/definitions/Error"
        "404":
          description: Not found
          schema:
            $ref: "#/definitions/Error"
  /reviews:
    get:
      parameters:
        - {name: reviewer, in: query, type: string}
        - {name: gameIds, in: query, type: array, items: {type: string}, collectionFormat: multi}
        - {name: scoreMin, in: query, type: integer}
        - {name: scoreMax, in: query, type: integer}
        - {name: reviewDate, in: query, type: string, format: date}
      responses:
        "200":
          description: Reviews
          schema:
            $ref: "#/definitions/ReviewResource"
        "400":
          description: Bad request
          schema:
            $ref: "#/definitions/Error"
  /reviews/{reviewId}:
    parameters:
      - {name: reviewId, in: path, required: true, type: string}
    get:
      responses:
        "200":
          description: Review
          schema:
            $ref: "#/definitions/ReviewResource"
        "400":
          description: Bad request
          schema:
            $ref: "#/definitions/Error"
        "404":
          description: Not found
          schema:
            $ref: "#/definitions/Error"
parameters:
  developerId:
    name: developerId
    in: path
    required: true
    type: string
definitions:
  SelfLink:
    type: object
    properties:
      self:
        type: string
  DeveloperResource:
    type: object
    required: [id, type, attributes]
    properties:
      id:
        type: string
      type:
        type: string
        enum: [developer]
      attributes:
        type: object
        required: [name]
        properties:
          name:
            type: string
          website:
            type: string
            x-nullable: true
      links:
        $ref: "#/definitions/SelfLink"
  GameResource:
    type: object
    required: [id, type, attributes]
    properties:
      id:
        type: string
      type:
        type: string
        enum: [game]
      attributes:
        type: object
        required: [name, developerId, score]
        properties:
          name:
            type: string
          developerId:
            type: string
          score:
            type: integer
          releaseDate:
            type: string
            format: date
            x-nullable: true
      links:
        $ref: "#/definitions/SelfLink"
  ReviewResource:
    type: object
    required: [id, type, attributes]
    properties:
      id:
        type: string
      type:
        type: string
        enum: [review]
      attributes:
        type: object
        required: [reviewer, gameId, score, reviewDate]
        properties:
          reviewer:
            type: string
          gameId:
            type: string
          score:
            type: integer
          reviewDate:
            type: string
            format: date
      links:
        $ref: "#/definitions/SelfLink"
  Error:
    type: object
    required: [errors]
    properties:
      errors:
        type: array
        items:
          type: object
          required: [status, title]
          properties:
            status:
              type: string
            title:
              type: string
            code:
              type: string
            detail:
              type: string
            links:
              type: object
"##;

/// OpenAPI 3.x document for the developers endpoints, as JSON.
pub fn openapi_developers(version: &str) -> Value {
    let nullable_string = if version.starts_with("3.1") {
        json!({"type": ["string", "null"]})
    } else {
        json!({"type": "string", "nullable": true})
    };
    let json_schema = |name: &str| {
        json!({"content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{name}")}}}})
    };
    let mut ok = json_schema("DeveloperResource");
    ok["description"] = json!("Developer");
    let mut err = json_schema("Error");
    err["description"] = json!("Error");
    json!({
        "openapi": version,
        "info": {"title": "Games API", "version": "1.0"},
        "paths": {
            "/developers": {"get": {
                "parameters": [{"name": "name", "in": "query", "schema": {"type": "string"}}],
                "responses": {"200": ok.clone(), "400": err.clone()}
            }},
            "/developers/{developerId}": {
                "parameters": [{"name": "developerId", "in": "path", "required": true, "schema": {"type": "string"}}],
                "get": {"responses": {"200": ok, "400": err.clone(), "404": err}}
            }
        },
        "components": {"schemas": {
            "DeveloperResource": {
                "type": "object",
                "required": ["id", "type", "attributes"],
                "properties": {
                    "id": {"type": "string"},
                    "type": {"type": "string", "enum": ["developer"]},
                    "attributes": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {"name": {"type": "string"}, "website": nullable_string}
                    },
                    "links": {"type": "object", "properties": {"self": {"type": "string"}}}
                }
            },
            "Error": {
                "type": "object",
                "required": ["errors"],
                "properties": {"errors": {"type": "array", "items": {
                    "type": "object",
                    "required": ["status", "title"],
                    "properties": {"status": {"type": "string"}, "title": {"type": "string"}}
                }}}
            }
        }}
    })
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// Config pointing at `base_url` with the given `test_cases`.
pub fn config(base_url: &str, test_cases: Value) -> Config {
    let raw: RawConfig = serde_json::from_value(json!({
        "base_url": base_url,
        "timeout_secs": 5.0,
        "test_cases": test_cases
    }))
    .expect("raw config");
    Config::from_raw(raw).expect("config")
}

/// Every case set, with values the stub API satisfies.
pub fn all_cases() -> Value {
    json!({
        "valid_developer_ids": [1, "2"],
        "non_existant_developer_ids": [999999],
        "invalid_developer_ids": ["abc"],
        "developer_names": ["Nintendo"],
        "valid_game_ids": [1, 2],
        "non_existant_game_ids": [999],
        "invalid_game_ids": ["x1"],
        "game_names": ["Tetris"],
        "game_developer_ids": [1],
        "scores": [70],
        "valid_review_ids": [1],
        "non_existant_review_ids": [42],
        "invalid_review_ids": ["bad"],
        "reviewer_names": ["Jane"],
        "review_game_ids": [["1", "3"], ["3"]],
        "review_invalid_game_id_formats": ["abc"],
        "review_review_dates": ["2020-01-02"],
        "review_invalid_date_formats": ["01/02/2020"]
    })
}
