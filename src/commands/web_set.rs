use reqwest::Method;
use serde_json::{Map, Value};

use super::{merge_extras, Command, CommandOutput};
use crate::api::{urls, M365Client, ResolvedRequest, Resource};
use crate::error::{CommandError, CommandResult};
use crate::options::{Format, OptionSchema, OptionSpec, ValidOptions};
use crate::types::{RootFolderUpdate, WebUpdate};

const HEADER_LAYOUTS: &[&str] = &["standard", "compact"];
const SEARCH_SCOPES: &[&str] = &["defaultscope", "tenant", "hub", "site"];

pub static SCHEMA: OptionSchema = OptionSchema {
    path: &["spo", "web", "set"],
    description: "Updates subsite properties",
    options: &[
        OptionSpec::string("url", "URL of the subsite to update")
            .format(Format::HttpsUrl)
            .required(),
        OptionSpec::string("title", "New title for the subsite"),
        OptionSpec::string("description", "New description for the subsite"),
        OptionSpec::string("siteLogoUrl", "New site logo URL; empty to remove the logo"),
        OptionSpec::flag("quickLaunchEnabled", "Show the quick launch"),
        OptionSpec::choice("headerLayout", HEADER_LAYOUTS, "Header layout"),
        OptionSpec::number("headerEmphasis", 0, 3, "Header background theme"),
        OptionSpec::flag("megaMenuEnabled", "Use mega menu navigation"),
        OptionSpec::flag("footerEnabled", "Show the footer"),
        OptionSpec::flag(
            "navAudienceTargetingEnabled",
            "Enable audience targeting of navigation links",
        ),
        OptionSpec::choice("searchScope", SEARCH_SCOPES, "Default search scope"),
        OptionSpec::string("welcomePage", "Site-relative URL of the welcome page"),
    ],
    rules: &[],
    allow_unknown: true,
};

/// Wire value of a header layout
fn header_layout(layout: &str) -> Option<u8> {
    match layout {
        "standard" => Some(1),
        "compact" => Some(2),
        _ => None,
    }
}

/// Wire value of a search scope (position in `SEARCH_SCOPES`)
fn search_scope(scope: &str) -> Option<u8> {
    SEARCH_SCOPES
        .iter()
        .position(|s| s.eq_ignore_ascii_case(scope))
        .and_then(|i| u8::try_from(i).ok())
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebSetOptions {
    pub url: String,
    pub update: WebUpdate,
    pub welcome_page: Option<String>,
    pub extras: Map<String, Value>,
}

pub struct WebSet;

impl Command for WebSet {
    type Options = WebSetOptions;

    fn schema() -> &'static OptionSchema {
        &SCHEMA
    }

    fn options(valid: &ValidOptions) -> CommandResult<WebSetOptions> {
        let url = valid
            .get_str("url")
            .ok_or_else(|| CommandError::validation("Required option url not specified"))?;

        let header_emphasis = valid
            .get_i64("headerEmphasis")
            .map(|v| {
                u8::try_from(v).map_err(|_| {
                    CommandError::validation(format!("{} is not a valid header emphasis", v))
                })
            })
            .transpose()?;

        let update = WebUpdate {
            title: valid.get_str("title").map(str::to_string),
            description: valid.get_str("description").map(str::to_string),
            site_logo_url: valid.get_str("siteLogoUrl").map(str::to_string),
            quick_launch_enabled: valid.get_bool("quickLaunchEnabled"),
            header_layout: valid.choice("headerLayout").and_then(header_layout),
            header_emphasis,
            mega_menu_enabled: valid.get_bool("megaMenuEnabled"),
            footer_enabled: valid.get_bool("footerEnabled"),
            nav_audience_targeting_enabled: valid.get_bool("navAudienceTargetingEnabled"),
            search_scope: valid.choice("searchScope").and_then(search_scope),
        };

        Ok(WebSetOptions {
            url: url.to_string(),
            update,
            welcome_page: valid.get_str("welcomePage").map(str::to_string),
            extras: valid.extras(),
        })
    }

    async fn execute(client: &M365Client, options: WebSetOptions) -> CommandResult<CommandOutput> {
        let resource = Resource::sharepoint(&options.url)?;
        let typed = serde_json::to_value(&options.update)
            .map_err(|e| CommandError::Other(anyhow::anyhow!("Failed to serialize body: {}", e)))?;

        let request = ResolvedRequest::sharepoint(
            Method::PATCH,
            urls::join(&options.url, "_api/web"),
            resource.clone(),
        )
        .with_body(&merge_extras(typed, options.extras))?;
        client.execute(request).await?;

        if let Some(welcome_page) = options.welcome_page {
            let request = ResolvedRequest::sharepoint(
                Method::PATCH,
                urls::join(&options.url, "_api/web/RootFolder"),
                resource,
            )
            .with_body(&RootFolderUpdate { welcome_page })?;
            client.execute(request).await?;
        }

        Ok(CommandOutput::Nothing)
    }
}
