use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Command, CommandOutput};
use crate::api::urls::encode_query_parameter;
use crate::api::{IdExtractor, Lookup, M365Client, ResolvedRequest, Target};
use crate::error::{CommandError, CommandResult};
use crate::options::{Format, OptionSchema, OptionSpec, Rule, ValidOptions};
use crate::types::TeamsAppInstallation;

pub static SCHEMA: OptionSchema = OptionSchema {
    path: &["teams", "user", "app", "list"],
    description: "List the apps installed in the personal scope of the specified user",
    options: &[
        OptionSpec::string("userId", "ID of the user").format(Format::Guid),
        OptionSpec::string("userName", "UPN of the user").format(Format::Upn),
    ],
    rules: &[Rule::ExactlyOneOf(&["userId", "userName"])],
    allow_unknown: false,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(String),
    Name(String),
}

/// Row of the `text` output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledAppRow {
    pub id: String,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub version: Option<String>,
}

impl From<TeamsAppInstallation> for InstalledAppRow {
    fn from(installation: TeamsAppInstallation) -> Self {
        let definition = installation.teams_app_definition;
        Self {
            id: installation.id,
            app_id: definition.as_ref().and_then(|d| d.teams_app_id.clone()),
            display_name: definition.as_ref().and_then(|d| d.display_name.clone()),
            version: definition.and_then(|d| d.version),
        }
    }
}

impl InstalledAppRow {
    /// Row for one installation; entries missing the expected shape keep
    /// whatever fields are present
    fn from_value(item: &Value) -> Self {
        match serde_json::from_value::<TeamsAppInstallation>(item.clone()) {
            Ok(installation) => installation.into(),
            Err(e) => {
                debug!(error = %e, "Unexpected installed app shape");
                let field = |pointer: &str| item.pointer(pointer).and_then(Value::as_str).map(str::to_string);
                Self {
                    id: field("/id").unwrap_or_default(),
                    app_id: field("/teamsAppDefinition/teamsAppId"),
                    display_name: field("/teamsAppDefinition/displayName"),
                    version: field("/teamsAppDefinition/version"),
                }
            }
        }
    }
}

fn text_view(items: &[Value]) -> Value {
    let rows: Vec<InstalledAppRow> = items.iter().map(InstalledAppRow::from_value).collect();
    serde_json::to_value(rows).unwrap_or_default()
}

pub struct UserAppList;

impl Command for UserAppList {
    type Options = UserRef;

    fn schema() -> &'static OptionSchema {
        &SCHEMA
    }

    fn options(valid: &ValidOptions) -> CommandResult<UserRef> {
        match (valid.get_str("userId"), valid.get_str("userName")) {
            (Some(id), _) => Ok(UserRef::Id(id.to_string())),
            (None, Some(name)) => Ok(UserRef::Name(name.to_string())),
            (None, None) => Err(CommandError::validation(
                "Specify exactly one of the following options: userId, userName",
            )),
        }
    }

    async fn execute(client: &M365Client, user: UserRef) -> CommandResult<CommandOutput> {
        let target = match user {
            UserRef::Id(id) => Target::Id(id),
            UserRef::Name(name) => Target::Lookup(Lookup {
                request: ResolvedRequest::graph(
                    Method::GET,
                    client.graph_url(&format!("users/{}/id", encode_query_parameter(&name))),
                ),
                extract: IdExtractor::Scalar,
                not_found: format!("The specified user {} does not exist", name),
            }),
        };
        let user_id = client.resolve_target(target).await?;

        let items = client
            .get_all(ResolvedRequest::graph(
                Method::GET,
                client.graph_url(&format!(
                    "users/{}/teamwork/installedApps?$expand=teamsAppDefinition,teamsApp",
                    user_id
                )),
            ))
            .await?;

        Ok(CommandOutput::Views {
            text: text_view(&items),
            json: Value::Array(items),
        })
    }
}
