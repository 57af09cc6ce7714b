//! Demo services registered by the `remoting` binary.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use remoting_protocol::RemotingError;
use remoting_server::{RemotingServer, ServiceDefinition, Session};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Session key under which [`Auth`] records the logged-in user.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

/// Greets by name with the greeting it was registered with.
pub struct Greeter {
    greeting: String,
}

pub fn greeter() -> ServiceDefinition {
    ServiceDefinition::builder(|_, args| {
        Ok(Greeter {
            greeting: args.opt::<String>(0)?.unwrap_or_else(|| "Hi".into()),
        })
    })
    .method("hello", |this: &Greeter, args| {
        let name: String = args.get(0)?;
        Ok(format!("{} {name}", this.greeting))
    })
    .build()
}

/// Records a login in the connection's session.
pub struct Auth {
    session: Session,
}

pub fn auth() -> ServiceDefinition {
    ServiceDefinition::builder(|ctx, _| {
        Ok(Auth {
            session: ctx.session().clone(),
        })
    })
    .method("login", |this: &Auth, args| {
        let email: String = args.get(0)?;
        let password: String = args.get(1)?;
        if password.is_empty() {
            return Err(RemotingError::remote("LoginFailed", "Password must not be empty"));
        }
        let user = User { email };
        this.session.set(USER_KEY, serde_json::to_value(&user)?);
        Ok(user)
    })
    .method("logout", |this: &Auth, _| Ok(this.session.remove(USER_KEY).is_some()))
    .build()
}

/// Reads whatever [`Auth`] stored, answering asynchronously.
pub struct Profile {
    session: Session,
}

pub fn profile() -> ServiceDefinition {
    ServiceDefinition::builder(|ctx, _| {
        Ok(Profile {
            session: ctx.session().clone(),
        })
    })
    .async_method("whoami", |this: Arc<Profile>, _| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        this.session
            .get_as::<User>(USER_KEY)
            .ok_or_else(|| RemotingError::remote("NotLoggedIn", "No user on this connection"))
    })
    .build()
}

/// Per-instance counter.
pub struct Counter {
    value: Mutex<i64>,
}

pub fn counter() -> ServiceDefinition {
    ServiceDefinition::builder(|_, args| {
        Ok(Counter {
            value: Mutex::new(args.opt::<i64>(0)?.unwrap_or(0)),
        })
    })
    .method("increment", |this: &Counter, args| {
        let by = args.opt::<i64>(0)?.unwrap_or(1);
        let mut value = this.value.lock();
        let next = value
            .checked_add(by)
            .ok_or_else(|| RemotingError::remote("RangeError", "Counter would overflow"))?;
        *value = next;
        Ok(next)
    })
    .method("value", |this: &Counter, _| Ok(*this.value.lock()))
    .build()
}

/// Register every demo service on `server`.
pub fn register_all(server: &RemotingServer) {
    server.register("Greeter", greeter(), vec![json!("Hi")]);
    server.register("Auth", auth(), vec![]);
    server.register("Profile", profile(), vec![]);
    server.register("Counter", counter(), vec![]);
}
