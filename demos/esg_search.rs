use anyhow::{Result, bail};
use rdpapi::{Config, Controller, Reply, SessionToken};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that signs in, pulls ESG scores and search metadata for
    // one RIC, then renews the session with the refresh token.
    // Configure credentials via env vars or a `.env` file.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let universe = std::env::args().nth(1).unwrap_or_else(|| "IBM.N".to_string());
    let cfg = Config::from_env()?;
    let controller = Controller::new()?;

    let token = sign_in(&controller, &cfg, None)?;

    match controller.fetch_scored_entities(&cfg.esg_url(), &token.access_token, &universe)? {
        Reply::Received(scores) => println!("{scores:#}"),
        Reply::Unreachable(err) => eprintln!("ESG service unreachable: {err}"),
    }

    let query = json!({
        "View": "Entities",
        "Filter": format!("RIC eq '{universe}'"),
        "Select": "IssuerCommonName,DocumentTitle,RCSExchangeCountryLeaf,IssueISIN,ExchangeName,ExchangeCode,SearchAllCategoryv3,RCSTRBC2012Leaf",
    });
    match controller.fetch_search_results(&cfg.search_url(), &token.access_token, &query)? {
        Reply::Received(hits) => println!("{hits:#}"),
        Reply::Unreachable(err) => eprintln!("Search service unreachable: {err}"),
    }

    let renewed = sign_in(&controller, &cfg, Some(&token.refresh_token))?;
    println!("Session renewed, expires in {}s", renewed.expires_in);
    Ok(())
}

fn sign_in(controller: &Controller, cfg: &Config, refresh: Option<&str>) -> Result<SessionToken> {
    match controller.authenticate(
        &cfg.auth_url(),
        &cfg.username,
        &cfg.password,
        &cfg.client_id,
        refresh,
    )? {
        Reply::Received(token) => Ok(token),
        Reply::Unreachable(err) => bail!("token endpoint unreachable: {err}"),
    }
}
