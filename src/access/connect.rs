//! Auto-connect: one authenticated attempt over the recommended method. There is no
//! cascade to other methods, and Telnet/SSH logins are left to the operator.

use std::net::Ipv4Addr;

use tracing::{debug, info};
use url::Url;

use super::types::{AccessMethod, AccessRecommendation, AuthStatus, ConnectionAttempt};
use crate::scanner::{Credentials, NetworkProbe, PortProbeResult};

/// A `<form` on the same line as a login-ish keyword. A hint, not proof.
pub fn has_login_form(body: &str) -> bool {
    body.lines().any(|line| {
        let line = line.to_lowercase();
        line.contains("<form")
            && ["login", "auth", "password"]
                .iter()
                .any(|keyword| line.contains(keyword))
    })
}

/// `telnet://ip` or `ssh://user@ip`
fn manual_url(method: AccessMethod, ip: Ipv4Addr, username: &str) -> Option<String> {
    let mut url = Url::parse(&format!("{}://{}", method, ip)).ok()?;
    if method == AccessMethod::Ssh {
        url.set_username(username).ok()?;
    }
    Some(url.as_str().trim_end_matches('/').to_string())
}

pub async fn attempt(
    probe: &dyn NetworkProbe,
    ip: Ipv4Addr,
    recommendation: &AccessRecommendation,
    ports: &PortProbeResult,
    credentials: &Credentials,
) -> ConnectionAttempt {
    let mut result = ConnectionAttempt {
        ip,
        method: recommendation.method,
        status: AuthStatus::NoAccessMethod,
        success: false,
        url: None,
        http_status: None,
        login_form_detected: false,
        manual_credentials: None,
        open_ports: ports.open_ports(),
        message: String::new(),
    };

    match recommendation.method {
        AccessMethod::Http | AccessMethod::Https => {
            let Some(url) = recommendation.url.clone().or_else(|| recommendation.method.url(ip))
            else {
                result.message = "No URL for web access".to_string();
                return result;
            };
            let method = recommendation.method.to_string().to_uppercase();

            // Closed ports and 404 roots get no credentials
            let usable = ports.authenticable();
            if recommendation
                .method
                .service()
                .is_some_and(|service| !usable.is_open(service))
            {
                debug!(%ip, %url, "No login page to authenticate against");
                result.status = AuthStatus::Inconclusive;
                result.message = format!(
                    "{} has no login page at {}. Try logging in manually.",
                    method, url
                );
                result.url = Some(url);
                return result;
            }

            match probe.http_status(&url, Some(credentials)).await {
                Some(code @ (200 | 302)) => {
                    info!(%ip, %url, "Authenticated over {}", method);
                    result.status = AuthStatus::Authenticated;
                    result.success = true;
                    result.http_status = Some(code);
                    result.message = format!("Authenticated via {} Basic", method);
                }
                Some(code) => {
                    let form = probe.http_body(&url).await.is_some_and(|b| has_login_form(&b));
                    debug!(%ip, code, form, "Authentication not confirmed");
                    result.status = AuthStatus::Rejected;
                    result.http_status = Some(code);
                    result.login_form_detected = form;
                    result.message = if form {
                        "Login form detected. Try logging in manually.".to_string()
                    } else {
                        format!(
                            "Could not authenticate automatically (HTTP {}). Try logging in manually.",
                            code
                        )
                    };
                }
                None => {
                    result.status = AuthStatus::Inconclusive;
                    result.message = format!("No response from {}", url);
                }
            }
            result.url = Some(url);
        }
        AccessMethod::Telnet | AccessMethod::Ssh => {
            let url = manual_url(recommendation.method, ip, &credentials.username);
            result.status = AuthStatus::ManualLogin;
            result.message = match recommendation.method {
                AccessMethod::Telnet => format!(
                    "Telnet port available. Use 'telnet {}' with {}:{}",
                    ip, credentials.username, credentials.password
                ),
                _ => format!(
                    "SSH port available. Use 'ssh {}@{}' with password {}",
                    credentials.username, ip, credentials.password
                ),
            };
            result.url = url;
            result.manual_credentials = Some(credentials.clone());
        }
        AccessMethod::Unknown => {
            result.message = "No standard access method detected".to_string();
        }
    }

    result
}
