//! Stub adapters for the messaging ports: log the message and report it
//! sent. The development default for non-networked capability types.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::PortError;
use crate::traits::{Delivery, EmailMessage, EmailProvider, SmsMessage, SmsProvider};

#[derive(Debug, Default)]
pub struct StubEmail;

#[async_trait]
impl EmailProvider for StubEmail {
    async fn send(
        &self,
        _cancel: &CancellationToken,
        msg: &EmailMessage,
    ) -> Result<Delivery, PortError> {
        info!(to = %msg.to, from = %msg.from, subject = %msg.subject, "sending email (stub)");
        Ok(Delivery {
            delivery_status: "sent".into(),
            sent: true,
        })
    }
}

#[derive(Debug, Default)]
pub struct StubSms;

#[async_trait]
impl SmsProvider for StubSms {
    async fn send(
        &self,
        _cancel: &CancellationToken,
        msg: &SmsMessage,
    ) -> Result<Delivery, PortError> {
        info!(to = %msg.to, "sending sms (stub)");
        Ok(Delivery {
            delivery_status: "sent".into(),
            sent: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stubs_report_sent() {
        let cancel = CancellationToken::new();
        let email = StubEmail
            .send(
                &cancel,
                &EmailMessage {
                    to: "a@example.com".into(),
                    from: "b@example.com".into(),
                    subject: "hi".into(),
                    body: "hello".into(),
                },
            )
            .await
            .expect("send");
        assert!(email.sent);
        assert_eq!(email.delivery_status, "sent");

        let sms = StubSms
            .send(
                &cancel,
                &SmsMessage {
                    to: "+61400000000".into(),
                    body: "hello".into(),
                },
            )
            .await
            .expect("send");
        assert!(sms.sent);
    }
}
