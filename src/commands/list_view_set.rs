use reqwest::Method;
use serde_json::{Map, Value};

use super::{Command, CommandOutput};
use crate::api::urls::{self, encode_query_parameter};
use crate::api::{M365Client, ResolvedRequest, Resource};
use crate::error::{CommandError, CommandResult};
use crate::options::{Format, OptionSchema, OptionSpec, Rule, ValidOptions};

pub static SCHEMA: OptionSchema = OptionSchema {
    path: &["spo", "list", "view", "set"],
    description: "Updates existing list view",
    options: &[
        OptionSpec::string("webUrl", "URL of the site where the list is located")
            .format(Format::HttpsUrl)
            .required(),
        OptionSpec::string("listId", "ID of the list").format(Format::Guid),
        OptionSpec::string("listTitle", "Title of the list"),
        OptionSpec::string("listUrl", "Server- or site-relative URL of the list"),
        OptionSpec::string("id", "ID of the view to update").format(Format::Guid),
        OptionSpec::string("title", "Title of the view to update"),
    ],
    rules: &[
        Rule::ExactlyOneOf(&["listId", "listTitle", "listUrl"]),
        Rule::ExactlyOneOf(&["id", "title"]),
    ],
    allow_unknown: true,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRef {
    Id(String),
    Title(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRef {
    Id(String),
    Title(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListViewSetOptions {
    pub web_url: String,
    pub list: ListRef,
    pub view: ViewRef,
    /// View properties to update, by wire name
    pub fields: Map<String, Value>,
}

impl ListViewSetOptions {
    /// REST URL of the view
    pub fn view_url(&self) -> CommandResult<String> {
        let web = urls::join(&self.web_url, "_api/web");
        let list = match &self.list {
            ListRef::Id(id) => format!("{}/lists(guid'{}')", web, encode_query_parameter(id)),
            ListRef::Title(title) => {
                format!("{}/lists/GetByTitle('{}')", web, encode_query_parameter(title))
            }
            ListRef::Url(url) => {
                let server_relative = urls::server_relative_path(&self.web_url, url)?;
                format!("{}/GetList('{}')", web, encode_query_parameter(&server_relative))
            }
        };
        Ok(match &self.view {
            ViewRef::Id(id) => format!("{}/views/GetById('{}')", list, encode_query_parameter(id)),
            ViewRef::Title(title) => {
                format!("{}/views/GetByTitle('{}')", list, encode_query_parameter(title))
            }
        })
    }
}

pub struct ListViewSet;

impl Command for ListViewSet {
    type Options = ListViewSetOptions;

    fn schema() -> &'static OptionSchema {
        &SCHEMA
    }

    fn options(valid: &ValidOptions) -> CommandResult<ListViewSetOptions> {
        let owned = |name: &str| valid.get_str(name).map(str::to_string);

        let web_url = owned("webUrl")
            .ok_or_else(|| CommandError::validation("Required option webUrl not specified"))?;
        let list = owned("listId")
            .map(ListRef::Id)
            .or_else(|| owned("listTitle").map(ListRef::Title))
            .or_else(|| owned("listUrl").map(ListRef::Url))
            .ok_or_else(|| {
                CommandError::validation(
                    "Specify exactly one of the following options: listId, listTitle, listUrl",
                )
            })?;
        let view = owned("id")
            .map(ViewRef::Id)
            .or_else(|| owned("title").map(ViewRef::Title))
            .ok_or_else(|| {
                CommandError::validation("Specify exactly one of the following options: id, title")
            })?;

        Ok(ListViewSetOptions {
            web_url,
            list,
            view,
            fields: valid.extras(),
        })
    }

    async fn execute(
        client: &M365Client,
        options: ListViewSetOptions,
    ) -> CommandResult<CommandOutput> {
        let request = ResolvedRequest::sharepoint(
            Method::PATCH,
            options.view_url()?,
            Resource::sharepoint(&options.web_url)?,
        )
        .with_digest(&options.web_url)
        .with_body(&options.fields)?;

        client.execute(request).await?;
        Ok(CommandOutput::Nothing)
    }
}
