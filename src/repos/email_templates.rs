//! Email templates repo
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Fail;
use uuid::Uuid;

use models::*;
use repos::types::RepoResult;
use schema::offer_assignment_email_templates::dsl as EmailTemplates;

pub struct EmailTemplatesRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
}

pub trait EmailTemplatesRepo {
    /// Creates new template
    fn create(&self, payload: NewEmailTemplate) -> RepoResult<EmailTemplate>;

    /// Deactivates every template of a type for an enterprise, returns how many changed
    fn deactivate(&self, enterprise_customer_uuid: Uuid, email_type: EmailType) -> RepoResult<usize>;

    /// Get template of an enterprise
    fn get(&self, enterprise_customer_uuid: Uuid, id_arg: EmailTemplateId) -> RepoResult<Option<EmailTemplate>>;

    /// Templates of an enterprise, active first
    fn list(&self, enterprise_customer_uuid: Uuid, search: EmailTemplateSearch) -> RepoResult<Vec<EmailTemplate>>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> EmailTemplatesRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T) -> Self {
        Self { db_conn }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> EmailTemplatesRepo
    for EmailTemplatesRepoImpl<'a, T>
{
    fn create(&self, payload: NewEmailTemplate) -> RepoResult<EmailTemplate> {
        debug!("Create new email template {:?}.", payload);
        let query = diesel::insert_into(EmailTemplates::offer_assignment_email_templates).values(&payload);
        query
            .get_result::<EmailTemplate>(self.db_conn)
            .map_err(|e| e.context(format!("Creates new email template: {:?} error occurred", payload)).into())
    }

    fn deactivate(&self, enterprise_customer_uuid: Uuid, email_type_arg: EmailType) -> RepoResult<usize> {
        debug!("Deactivate {} templates of enterprise {}.", email_type_arg, enterprise_customer_uuid);
        let filtered = EmailTemplates::offer_assignment_email_templates
            .filter(EmailTemplates::enterprise_customer_uuid.eq(enterprise_customer_uuid))
            .filter(EmailTemplates::email_type.eq(email_type_arg))
            .filter(EmailTemplates::active.eq(true));
        let query = diesel::update(filtered).set(EmailTemplates::active.eq(false));
        query.execute(self.db_conn).map_err(|e| {
            e.context(format!(
                "Deactivate {} templates of enterprise {} error occurred",
                email_type_arg, enterprise_customer_uuid
            )).into()
        })
    }

    fn get(&self, enterprise_customer_uuid: Uuid, id_arg: EmailTemplateId) -> RepoResult<Option<EmailTemplate>> {
        debug!("Find email template {} of enterprise {}.", id_arg, enterprise_customer_uuid);
        let query = EmailTemplates::offer_assignment_email_templates
            .filter(EmailTemplates::enterprise_customer_uuid.eq(enterprise_customer_uuid))
            .filter(EmailTemplates::id.eq(id_arg));
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(|e| e.context(format!("Find email template by id: {} error occurred", id_arg)).into())
    }

    fn list(&self, enterprise_customer_uuid: Uuid, search: EmailTemplateSearch) -> RepoResult<Vec<EmailTemplate>> {
        debug!("List email templates of enterprise {} by {:?}.", enterprise_customer_uuid, search);
        let mut query = EmailTemplates::offer_assignment_email_templates
            .filter(EmailTemplates::enterprise_customer_uuid.eq(enterprise_customer_uuid))
            .into_boxed();
        if let Some(email_type_arg) = search.email_type {
            query = query.filter(EmailTemplates::email_type.eq(email_type_arg));
        }
        if let Some(active_arg) = search.active {
            query = query.filter(EmailTemplates::active.eq(active_arg));
        }

        query
            .order((EmailTemplates::active.desc(), EmailTemplates::id.asc()))
            .get_results(self.db_conn)
            .map_err(|e| e.context(format!("List email templates by {:?} failed.", search)).into())
    }
}
