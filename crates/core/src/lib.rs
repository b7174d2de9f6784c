//! Tiered triage of voice commands for a robot body.
//!
//! A recognized utterance enters through [`ingress::Ingress`], is resolved by
//! [`dispatch::Dispatcher`] through the cheapest tier that can handle it, and
//! leaves as a [`directive::Directive`] sent to the body over HTTP.

pub mod body;
pub mod breaker;
pub mod classifier;
pub mod conversation;
pub mod directive;
pub mod dispatch;
pub mod edit_distance;
pub mod ingress;
pub mod llm_client;
pub mod monitor;
pub mod mood;
pub mod prompts;
pub mod reflex;
pub mod reply;
