//! ThingFabric REST endpoints
//!
//! The concrete operations exposed by the `tf` binary and the global flag
//! metadata shared between them.

use reqwest::Method;
use serde_json::Value;

use crate::error::{DispatchError, RegistryError};
use crate::metadata::{FlagMeta, MetadataTable};
use crate::registry::{CallArgs, Operation, Registry};
use crate::request::{scalar_to_string, Executor, RequestResult};

/// Flag metadata keyed by parameter name, shared by every operation.
pub fn metadata() -> MetadataTable {
    MetadataTable::new()
        .with("ttl", FlagMeta::help_text("TTL in seconds").int())
        .with("account_id", FlagMeta::help_text("ThingFabric account ID"))
        .with("email", FlagMeta::help_text("new account email"))
        .with("password", FlagMeta::help_text("new account password (plaintext)"))
        .with("project", FlagMeta::help_text("new account project"))
        .with("username", FlagMeta::help_text("new account user name"))
        .with(
            "shouldBanOnAverage",
            FlagMeta::help_text("ban account on limit overage").switch(),
        )
        .with("topic", FlagMeta::help_text("MQTT topic"))
        .with("qos", FlagMeta::help_text("MQTT QoS (0, 1, or 2)").int())
        .with("clientid", FlagMeta::help_text("MQTT client ID"))
        .with("name", FlagMeta::help_text("new name"))
        .with("description", FlagMeta::help_text("new description"))
        .with("domain", FlagMeta::help_text("domain"))
        .with("stuff", FlagMeta::help_text("stuff"))
        .with("thing", FlagMeta::help_text("thing"))
        .with("asJSON", FlagMeta::help_text("return data as JSON").switch())
        .with("startDate", FlagMeta::help_text("start date in YYYY-MM-DD format"))
        .with("endDate", FlagMeta::help_text("end date in YYYY-MM-DD format"))
        .with("pagekey", FlagMeta::help_text("pagekey"))
        .with(
            "ignore_active",
            FlagMeta::help_text("return all things (i.e. active and not active)").switch(),
        )
        .with("limit", FlagMeta::help_text("number of things returned"))
        .with("whatever", FlagMeta::help_text("whatever"))
        .with(
            "attributes",
            FlagMeta::help_text("attributes (you can specify more than one)")
                .metavar("ATTRIBUTE")
                .list(),
        )
}

/// Every ThingFabric operation.
pub fn operations() -> Vec<Operation> {
    vec![
        // auth
        Operation::request("get_token", "auth", Method::GET, "auth/token")
            .summary("Show the current access token"),
        Operation::request("create_token", "auth", Method::POST, "auth/token")
            .summary("Create an access token")
            .optional("ttl"),
        // accounts
        Operation::request("get_account", "accounts", Method::GET, "accounts/{account_id}")
            .summary("Show an account")
            .required("account_id"),
        Operation::request("create_account", "accounts", Method::POST, "accounts")
            .summary("Create an account")
            .required("email")
            .required("password")
            .optional("project")
            .optional("username")
            .optional("shouldBanOnAverage"),
        Operation::request("update_account", "accounts", Method::PUT, "accounts")
            .summary("Update an account")
            .required("email")
            .required("password")
            .optional("username")
            .optional("shouldBanOnAverage"),
        Operation::request("delete_account", "accounts", Method::DELETE, "accounts/{account}")
            .summary("Delete an account")
            .required("account")
            .meta("account", FlagMeta::help_text("ThingFabric account ID")),
        // mqtt
        Operation::request("publish", "mqtt", Method::POST, "publish")
            .summary("Publish a message")
            .required("data")
            .optional("topic")
            .optional("qos")
            .optional("clientid")
            .meta("data", FlagMeta::help_text("message payload")),
        // projects
        Operation::request("get_all_projects", "projects", Method::GET, "projects")
            .summary("List projects"),
        Operation::request("get_project", "projects", Method::GET, "projects/{project_id}")
            .summary("Show a project")
            .required("project_id"),
        Operation::request("create_project", "projects", Method::POST, "projects")
            .summary("Create a project")
            .required("name")
            .required("description")
            .meta("name", FlagMeta::help_text("project name")),
        Operation::request("update_project", "projects", Method::PUT, "projects")
            .summary("Rename a project")
            .required("name"),
        Operation::request("delete_project", "projects", Method::DELETE, "projects/{project_id}")
            .summary("Delete a project")
            .required("project_id"),
        // rules
        Operation::request("get_all_rules", "rules", Method::GET, "rules")
            .summary("List rules")
            .optional("domain")
            .optional("stuff")
            .optional("thing")
            .optional("asJSON"),
        Operation::request("get_rule", "rules", Method::GET, "rules/{rule_id}")
            .summary("Show a rule")
            .required("rule_id")
            .optional("asJSON"),
        rule_write("create_rule", Method::POST).summary("Create a rule"),
        rule_write("update_rule", Method::PUT).summary("Update a rule"),
        Operation::request("delete_rule", "rules", Method::DELETE, "rules/{rule_id}")
            .summary("Delete a rule")
            .required("rule_id"),
        // stats
        Operation::request("get_delivered_stats", "stats", Method::GET, "stats/delivered")
            .summary("Delivered message statistics")
            .required("startDate")
            .optional("endDate"),
        Operation::request("get_published_stats", "stats", Method::GET, "stats/published")
            .summary("Published message statistics")
            .required("startDate")
            .optional("endDate"),
        // sql
        Operation::request("get_all_sql_rules", "sql", Method::GET, "sql")
            .summary("List SQL rules"),
        Operation::request("get_sql_rule", "sql", Method::GET, "sql/{rule_id}")
            .summary("Show a SQL rule")
            .required("rule_id"),
        Operation::request("create_sql_rule", "sql", Method::POST, "sql")
            .summary("Create a SQL rule"),
        Operation::request("delete_sql_rule", "sql", Method::DELETE, "sql/{rule_id}")
            .summary("Delete a SQL rule")
            .required("rule_id"),
        Operation::request(
            "create_rule_integration",
            "sql",
            Method::POST,
            "sql/{rule_id}/integrations",
        )
        .summary("Attach an integration to a SQL rule")
        .required("rule_id"),
        Operation::custom("delete_rule_integration", "sql", delete_rule_integration)
            .summary("Remove one or all integrations from a SQL rule")
            .required("rule_id")
            .optional("integration_id"),
        // things
        Operation::custom("get_all_things", "things", get_all_things)
            .summary("List things")
            .optional("pagekey")
            .optional("ignore_active")
            .optional("limit")
            .meta("limit", FlagMeta::new().int()),
        Operation::request("create_thing", "things", Method::POST, "things")
            .summary("Create a thing")
            .optional("domain")
            .optional("stuff")
            .optional("name")
            .optional("description"),
        Operation::request("delete_thing", "things", Method::DELETE, "things/{thing_name}")
            .summary("Delete a thing")
            .required("thing_name")
            .optional("domain")
            .optional("stuff"),
        Operation::request(
            "get_present_thing",
            "things",
            Method::GET,
            "things/{thing_name}/present",
        )
        .summary("Show the present state of a thing")
        .required("thing_name")
        .optional("domain")
        .optional("stuff")
        .optional("whatever"),
        Operation::custom("get_past_thing", "things", get_past_thing)
            .summary("Show the past states of a thing")
            .required("thing_name")
            .optional("domain")
            .optional("stuff")
            .optional("attributes"),
        Operation::request("get_thing_count", "things", Method::GET, "things/count")
            .summary("Count things")
            .optional("domain"),
    ]
}

/// Registry holding every ThingFabric operation.
pub fn registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    for op in operations() {
        registry.register(op)?;
    }
    Ok(registry)
}

fn rule_write(name: &str, method: Method) -> Operation {
    Operation::request(name, "rules", method, "rules")
        .required("name")
        .required("data")
        .optional("domain")
        .optional("stuff")
        .optional("thing")
        .optional("description")
        .meta("name", FlagMeta::help_text("rule name"))
        .meta("data", FlagMeta::help_text("rule definition"))
}

fn arg_string(args: &CallArgs, name: &str) -> Option<String> {
    args.get(name)
        .filter(|v| !v.is_null())
        .map(scalar_to_string)
}

fn carry(args: &CallArgs, names: &[&str]) -> CallArgs {
    names
        .iter()
        .map(|name| {
            let value = args.get(*name).cloned().unwrap_or(Value::Null);
            (name.to_string(), value)
        })
        .collect()
}

/// `--ignore-active` inverts into the API's `active` filter.
fn get_all_things(executor: &Executor, args: &CallArgs) -> Result<RequestResult, DispatchError> {
    executor.execute(Method::GET, "things", Some(all_things_params(args)))
}

fn all_things_params(args: &CallArgs) -> CallArgs {
    let mut params = carry(args, &["pagekey", "limit"]);
    let active = match args.get("ignore_active") {
        Some(Value::Bool(ignore)) => Value::Bool(!ignore),
        _ => Value::Null,
    };
    params.insert("active".into(), active);
    params
}

/// Attributes travel as one comma-separated value.
fn get_past_thing(executor: &Executor, args: &CallArgs) -> Result<RequestResult, DispatchError> {
    let thing = arg_string(args, "thing_name").unwrap_or_default();
    let mut params = carry(args, &["domain", "stuff"]);
    let attributes = match args.get("attributes") {
        Some(Value::Array(items)) => Value::String(
            items
                .iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => Value::Null,
    };
    params.insert("attributes".into(), attributes);
    let path = format!("things/{}/past", urlencoding::encode(&thing));
    executor.execute(Method::GET, &path, Some(params))
}

/// Without an integration id, every integration of the rule is removed.
fn delete_rule_integration(
    executor: &Executor,
    args: &CallArgs,
) -> Result<RequestResult, DispatchError> {
    let rule_id = arg_string(args, "rule_id").unwrap_or_default();
    let path = match arg_string(args, "integration_id") {
        Some(integration) => format!(
            "sql/{}/integrations/{}",
            urlencoding::encode(&rule_id),
            urlencoding::encode(&integration)
        ),
        None => format!("sql/{}/integrations", urlencoding::encode(&rule_id)),
    };
    executor.execute(Method::DELETE, &path, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::flag_specs;
    use crate::request::Credentials;
    use mockito::Matcher;
    use reqwest::blocking::Client;
    use serde_json::json;

    fn executor(url: &str) -> Executor {
        Executor::new(Client::new(), url, Credentials::new("a", "s"))
    }

    fn args(value: Value) -> CallArgs {
        match value {
            Value::Object(map) => map,
            _ => CallArgs::new(),
        }
    }

    #[test]
    fn catalog_registers_cleanly() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), operations().len());
        assert_eq!(
            registry.groups().into_iter().collect::<Vec<_>>(),
            vec!["accounts", "auth", "mqtt", "projects", "rules", "sql", "stats", "things"]
        );
    }

    #[test]
    fn every_operation_builds_flags() {
        let table = metadata();
        for op in operations() {
            assert!(flag_specs(&op, &table).is_ok(), "{} failed to build", op.name);
        }
    }

    #[test]
    fn operation_override_beats_global_help() {
        let registry = registry().unwrap();
        let op = registry.lookup("create_project").unwrap();
        let flags = flag_specs(op, &metadata()).unwrap();
        let name = flags.iter().find(|f| f.param == "name").unwrap();
        assert_eq!(name.help, "project name");
    }

    #[test]
    fn get_all_things_inverts_ignore_active() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/things")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("active".into(), "false".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create();

        let call = args(json!({"pagekey": null, "ignore_active": true, "limit": 5}));
        let result = get_all_things(&executor(&server.url()), &call).unwrap();
        assert!(result.ok);
        mock.assert();
    }

    #[test]
    fn all_things_params_leave_active_unset_without_switch() {
        let params = all_things_params(&args(json!({"pagekey": "p2", "ignore_active": null})));
        assert_eq!(params["active"], Value::Null);
        assert_eq!(params["pagekey"], "p2");
        assert_eq!(params["limit"], Value::Null);
    }

    #[test]
    fn get_past_thing_joins_attributes() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/things/lamp/past")
            .match_query(Matcher::UrlEncoded(
                "attributes".into(),
                "temp,humidity".into(),
            ))
            .with_status(200)
            .with_body("{}")
            .create();

        let call = args(json!({"thing_name": "lamp", "attributes": ["temp", "humidity"]}));
        get_past_thing(&executor(&server.url()), &call).unwrap();
        mock.assert();
    }

    #[test]
    fn delete_rule_integration_picks_path() {
        let mut server = mockito::Server::new();
        let one = server
            .mock("DELETE", "/sql/r1/integrations/i9")
            .with_status(204)
            .create();
        let all = server
            .mock("DELETE", "/sql/r1/integrations")
            .with_status(204)
            .create();

        let exec = executor(&server.url());
        delete_rule_integration(&exec, &args(json!({"rule_id": "r1", "integration_id": "i9"})))
            .unwrap();
        delete_rule_integration(&exec, &args(json!({"rule_id": "r1", "integration_id": null})))
            .unwrap();
        one.assert();
        all.assert();
    }
}
