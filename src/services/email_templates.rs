//! EmailTemplates Services, per-enterprise greeting and closing of assignment emails
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::Connection;
use failure::{Error as FailureError, Fail};
use r2d2::ManageConnection;
use uuid::Uuid;

use super::types::ServiceFuture;
use config::Templates;
use errors::Error;
use models::*;
use repos::ReposFactory;
use services::{service_error, Service};

pub trait EmailTemplatesService {
    /// Templates of an enterprise, active ones first
    fn list_email_templates(&self, enterprise_customer_uuid: Uuid, search: EmailTemplateSearch) -> ServiceFuture<Vec<EmailTemplateWithBody>>;
    /// Returns template by id
    fn get_email_template(&self, enterprise_customer_uuid: Uuid, id_arg: EmailTemplateId) -> ServiceFuture<EmailTemplateWithBody>;
    /// Creates new active template, deactivating the previous ones of its type
    fn create_email_template(&self, enterprise_customer_uuid: Uuid, payload: NewEmailTemplatePayload) -> ServiceFuture<EmailTemplateWithBody>;
}

impl<
        T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static,
        M: ManageConnection<Connection = T>,
        F: ReposFactory<T>,
    > EmailTemplatesService for Service<T, M, F>
{
    fn list_email_templates(&self, enterprise_customer_uuid: Uuid, search: EmailTemplateSearch) -> ServiceFuture<Vec<EmailTemplateWithBody>> {
        if let Err(e) = self.authorized_user("list email templates") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let templates_repo = repo_factory.create_email_templates_repo(&*conn);

            templates_repo
                .list(enterprise_customer_uuid, search)
                .map(|templates| templates.into_iter().map(|template| with_body(template, &config.templates)).collect())
                .map_err(|e| e.context("Service EmailTemplates, list endpoint error occurred.").into())
        })
    }

    fn get_email_template(&self, enterprise_customer_uuid: Uuid, id_arg: EmailTemplateId) -> ServiceFuture<EmailTemplateWithBody> {
        if let Err(e) = self.authorized_user("get email template") {
            return service_error(e);
        }
        let repo_factory = self.static_context.repo_factory.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let templates_repo = repo_factory.create_email_templates_repo(&*conn);

            templates_repo
                .get(enterprise_customer_uuid, id_arg)
                .and_then(|template| template.ok_or_else(|| Error::NotFound.into()))
                .map(|template| with_body(template, &config.templates))
                .map_err(|e| e.context("Service EmailTemplates, get endpoint error occurred.").into())
        })
    }

    fn create_email_template(&self, enterprise_customer_uuid: Uuid, payload: NewEmailTemplatePayload) -> ServiceFuture<EmailTemplateWithBody> {
        if let Err(e) = self.authorized_user("create email template") {
            return service_error(e);
        }
        if let Err(errors) = payload.validate_payload() {
            return service_error(Error::Validate(errors).into());
        }
        let repo_factory = self.static_context.repo_factory.clone();
        let config = self.static_context.config.clone();

        self.spawn_on_pool(move |conn| {
            let templates_repo = repo_factory.create_email_templates_repo(&*conn);

            conn.transaction::<EmailTemplate, FailureError, _>(move || {
                let deactivated = templates_repo.deactivate(enterprise_customer_uuid, payload.email_type)?;
                debug!("Deactivated {} {} templates of {}", deactivated, payload.email_type, enterprise_customer_uuid);
                templates_repo.create(payload.into_new_template(enterprise_customer_uuid))
            }).map(|template| with_body(template, &config.templates))
            .map_err(|e| e.context("Service EmailTemplates, create endpoint error occurred.").into())
        })
    }
}

fn with_body(template: EmailTemplate, templates: &Templates) -> EmailTemplateWithBody {
    let email_body = templates.body_for(template.email_type).to_string();
    EmailTemplateWithBody { template, email_body }
}

#[cfg(test)]
mod tests {
    use tokio_core::reactor::Core;

    use models::*;
    use notifications::tests::*;
    use repos::repo_factory::tests::*;
    use services::*;

    fn template_payload(email_type: EmailType, greeting: &str) -> NewEmailTemplatePayload {
        NewEmailTemplatePayload {
            email_type,
            email_greeting: Some(greeting.to_string()),
            email_closing: None,
        }
    }

    #[test]
    fn test_create_email_template_deactivates_previous() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let service = create_service(Some(MOCK_USER_ID), factory, create_notifications_mock());
        let enterprise = mock_enterprise_uuid();

        let first = core
            .run(service.create_email_template(enterprise, template_payload(EmailType::Assign, "Hi")))
            .unwrap();
        core.run(service.create_email_template(enterprise, template_payload(EmailType::Remind, "Psst")))
            .unwrap();
        let second = core
            .run(service.create_email_template(enterprise, template_payload(EmailType::Assign, "<i>Hello</i>")))
            .unwrap();

        assert_eq!(second.template.email_greeting, "&lt;i&gt;Hello&lt;/i&gt;");
        assert_eq!(second.template.email_closing, "");
        assert!(!second.email_body.is_empty());

        let templates = core
            .run(service.list_email_templates(enterprise, EmailTemplateSearch::default()))
            .unwrap();
        let order: Vec<(EmailTemplateId, bool)> = templates.iter().map(|t| (t.template.id, t.template.active)).collect();
        assert_eq!(
            order,
            vec![(EmailTemplateId(2), true), (second.template.id, true), (first.template.id, false)]
        );
    }

    #[test]
    fn test_create_email_template_rejects_long_closing() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let service = create_service(Some(MOCK_USER_ID), factory, create_notifications_mock());

        let payload = NewEmailTemplatePayload {
            email_type: EmailType::Revoke,
            email_greeting: None,
            email_closing: Some("x".repeat(301)),
        };
        assert!(core.run(service.create_email_template(mock_enterprise_uuid(), payload)).is_err());
    }

    #[test]
    fn test_get_email_template_of_other_enterprise() {
        let mut core = Core::new().unwrap();
        let factory = ReposFactoryMock::default();
        let service = create_service(Some(MOCK_USER_ID), factory, create_notifications_mock());

        let created = core
            .run(service.create_email_template(mock_enterprise_uuid(), template_payload(EmailType::Assign, "Hi")))
            .unwrap();
        let found = core
            .run(service.get_email_template(mock_enterprise_uuid(), created.template.id))
            .unwrap();
        assert_eq!(found, created);
        assert!(core.run(service.get_email_template(mock_catalog_uuid(), created.template.id)).is_err());
    }
}
