use reqwest::Method;

use super::{Command, CommandOutput};
use crate::api::urls::encode_query_parameter;
use crate::api::{token, IdExtractor, Lookup, M365Client, ResolvedRequest, Resource, Target};
use crate::error::{CommandError, CommandResult};
use crate::options::{Format, OptionSchema, OptionSpec, Rule, ValidOptions};
use crate::types::{DateTimeTimeZone, ItemBody, NewTodoTask};

const STATUSES: &[&str] = &[
    "notStarted",
    "inProgress",
    "completed",
    "waitingOnOthers",
    "deferred",
];

pub static SCHEMA: OptionSchema = OptionSchema {
    path: &["todo", "task", "add"],
    description: "Add a task to a Microsoft To Do list",
    options: &[
        OptionSpec::string("title", "Title of the task").required(),
        OptionSpec::string("listName", "Name of the task list"),
        OptionSpec::string("listId", "ID of the task list"),
        OptionSpec::string("bodyContent", "Body of the task"),
        OptionSpec::choice("bodyContentType", &["text", "html"], "Type of the body content"),
        OptionSpec::choice("importance", &["low", "normal", "high"], "Importance of the task"),
        OptionSpec::string("dueDateTime", "Due date").format(Format::IsoDateTime),
        OptionSpec::string("reminderDateTime", "Reminder date and time")
            .format(Format::IsoDateTime),
        OptionSpec::string("categories", "Comma-separated categories"),
        OptionSpec::string("completedDateTime", "Completion date and time")
            .format(Format::IsoDateTime),
        OptionSpec::string("startDateTime", "Start date and time").format(Format::IsoDateTime),
        OptionSpec::choice("status", STATUSES, "Status of the task"),
    ],
    rules: &[
        Rule::ExactlyOneOf(&["listName", "listId"]),
        Rule::RequiresValue {
            option: "completedDateTime",
            other: "status",
            value: "completed",
        },
    ],
    allow_unknown: false,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskList {
    Id(String),
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskAddOptions {
    pub list: TaskList,
    pub task: NewTodoTask,
}

fn date_time(valid: &ValidOptions, name: &str) -> Option<DateTimeTimeZone> {
    valid.get_str(name).map(DateTimeTimeZone::utc)
}

fn split_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct TaskAdd;

impl TaskAdd {
    fn list_target(client: &M365Client, list: TaskList) -> Target {
        match list {
            TaskList::Id(id) => Target::Id(id),
            TaskList::Name(name) => Target::Lookup(Lookup {
                request: ResolvedRequest::graph(
                    Method::GET,
                    client.graph_url(&format!(
                        "me/todo/lists?$filter=displayName eq '{}'",
                        encode_query_parameter(&name)
                    )),
                ),
                extract: IdExtractor::FirstInCollection { field: "id" },
                not_found: "The specified task list does not exist".to_string(),
            }),
        }
    }
}

impl Command for TaskAdd {
    type Options = TaskAddOptions;

    fn schema() -> &'static OptionSchema {
        &SCHEMA
    }

    fn options(valid: &ValidOptions) -> CommandResult<TaskAddOptions> {
        let title = valid
            .get_str("title")
            .ok_or_else(|| CommandError::validation("Required option title not specified"))?;

        let list = match (valid.get_str("listId"), valid.get_str("listName")) {
            (Some(id), _) => TaskList::Id(id.to_string()),
            (None, Some(name)) => TaskList::Name(name.to_string()),
            (None, None) => {
                return Err(CommandError::validation(
                    "Specify exactly one of the following options: listName, listId",
                ))
            }
        };

        let task = NewTodoTask {
            title: title.to_string(),
            body: ItemBody {
                content: valid.get_str("bodyContent").map(str::to_string),
                content_type: valid.choice("bodyContentType").unwrap_or("text").to_string(),
            },
            importance: valid.choice("importance").map(str::to_string),
            due_date_time: date_time(valid, "dueDateTime"),
            reminder_date_time: date_time(valid, "reminderDateTime"),
            categories: valid.get_str("categories").map(split_categories),
            completed_date_time: date_time(valid, "completedDateTime"),
            start_date_time: date_time(valid, "startDateTime"),
            status: valid.choice("status").map(str::to_string),
        };

        Ok(TaskAddOptions { list, task })
    }

    async fn execute(client: &M365Client, options: TaskAddOptions) -> CommandResult<CommandOutput> {
        let access_token = client.access_token(&Resource::Graph).await?;
        if token::is_application_only(&access_token) {
            return Err(CommandError::Auth(
                "This command does not support application permissions.".to_string(),
            ));
        }

        let target = Self::list_target(client, options.list);
        let task = options.task;
        let created = client
            .dispatch(target, |list_id| {
                ResolvedRequest::graph(
                    Method::POST,
                    client.graph_url(&format!("me/todo/lists/{}/tasks", list_id)),
                )
                .with_body(&task)
            })
            .await?;

        Ok(CommandOutput::Value(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::options::{validate, ParsedOptions};
    use crate::session::Session;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn valid(parsed: ParsedOptions) -> CommandResult<TaskAddOptions> {
        TaskAdd::options(&validate(&SCHEMA, parsed)?)
    }

    fn base() -> ParsedOptions {
        ParsedOptions::new()
            .with("title", "New task")
            .with("listName", "Tasks List")
    }

    fn client(server: &MockServer, token: &str) -> M365Client {
        let mut config = Config::default();
        config.api.graph_url = server.uri();
        M365Client::new(&config, Session::with_static_token(token)).unwrap()
    }

    #[test]
    fn due_date_is_sent_in_utc() {
        let options = valid(base().with("dueDateTime", "2023-01-01")).unwrap();
        assert_eq!(
            serde_json::to_value(&options.task).unwrap(),
            json!({
                "title": "New task",
                "body": {"contentType": "text"},
                "dueDateTime": {"dateTime": "2023-01-01", "timeZone": "Etc/GMT"}
            })
        );
    }

    #[test]
    fn normalizes_choices_and_categories() {
        let options = valid(
            base()
                .with("importance", "HIGH")
                .with("bodyContent", "<b>hi</b>")
                .with("bodyContentType", "HTML")
                .with("categories", "Red, Blue,,")
                .with("status", "inprogress"),
        )
        .unwrap();
        assert_eq!(options.task.importance.as_deref(), Some("high"));
        assert_eq!(options.task.body.content_type, "html");
        assert_eq!(
            options.task.categories,
            Some(vec!["Red".to_string(), "Blue".to_string()])
        );
        assert_eq!(options.task.status.as_deref(), Some("inProgress"));
    }

    #[test]
    fn completed_date_requires_completed_status() {
        let completed = "2023-01-02T10:00:00Z";
        assert!(valid(base().with("completedDateTime", completed)).is_err());
        assert!(valid(
            base()
                .with("completedDateTime", completed)
                .with("status", "notStarted")
        )
        .is_err());
        assert!(valid(
            base()
                .with("completedDateTime", completed)
                .with("status", "completed")
        )
        .is_ok());
    }

    #[test]
    fn list_name_and_id_are_exclusive() {
        assert!(valid(base().with("listId", "AAMk")).is_err());
        assert!(valid(ParsedOptions::new().with("title", "x")).is_err());
        assert!(valid(base().with("dueDateTime", "tomorrow")).is_err());
        assert!(valid(base().with("importance", "urgent")).is_err());
        assert!(valid(base().with("unknown", "x")).is_err());
    }

    #[tokio::test]
    async fn resolves_list_by_name_then_creates_task() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/todo/lists"))
            .and(query_param("$filter", "displayName eq 'Tasks List'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "AAMkADY3NmM5ZjhiLTc3M2ItNDg5ZC1iNGRiLTAyM2FmMjVjZmUzOQAuAAAAAAAZ1T9YqZrvS66KkevskFAXAQBEMhhN5VK7RaaKpIc1KhMKAAAZ3e1AAAA="}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/me/todo/lists/AAMkADY3NmM5ZjhiLTc3M2ItNDg5ZC1iNGRiLTAyM2FmMjVjZmUzOQAuAAAAAAAZ1T9YqZrvS66KkevskFAXAQBEMhhN5VK7RaaKpIc1KhMKAAAZ3e1AAAA=/tasks"))
            .and(body_json(json!({"title": "New task", "body": {"contentType": "text"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "task-1",
                "title": "New task",
                "status": "notStarted"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let options = valid(base()).unwrap();
        let output = TaskAdd::execute(&client(&server, "test-token"), options)
            .await
            .unwrap();
        assert_eq!(
            output,
            CommandOutput::Value(json!({"id": "task-1", "title": "New task", "status": "notStarted"}))
        );
    }

    #[tokio::test]
    async fn missing_list_stops_before_creating() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/todo/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = TaskAdd::execute(&client(&server, "test-token"), valid(base()).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The specified task list does not exist");
    }

    #[tokio::test]
    async fn list_id_skips_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/todo/lists/AAMk/tasks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "t"})))
            .expect(1)
            .mount(&server)
            .await;

        let options = valid(
            ParsedOptions::new()
                .with("title", "New task")
                .with("listId", "AAMk"),
        )
        .unwrap();
        TaskAdd::execute(&client(&server, "test-token"), options)
            .await
            .unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn application_tokens_are_rejected() {
        let server = MockServer::start().await;
        let app_token = token::fake_jwt(&json!({"roles": ["Tasks.ReadWrite.All"]}));

        let err = TaskAdd::execute(&client(&server, &app_token), valid(base()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Auth(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
