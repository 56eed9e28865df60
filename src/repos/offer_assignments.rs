//! Offer assignments repo, the append/mutate ledger of code assignments
use chrono::Utc;
use diesel;
use diesel::connection::AnsiTransactionManager;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_dsl::RunQueryDsl;
use diesel::Connection;
use failure::Fail;

use models::*;
use repos::types::{insert_batch_size, RepoResult};
use schema::offer_assignments::dsl as OfferAssignments;

/// Values bound per `NewOfferAssignment` row
const NEW_OFFER_ASSIGNMENT_COLUMNS: usize = 4;

/// Search offer assignments
#[derive(Clone, Debug)]
pub enum OfferAssignmentSearch {
    Vouchers(Vec<VoucherId>),
    Email(String),
}

pub struct OfferAssignmentsRepoImpl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> {
    pub db_conn: &'a T,
}

pub trait OfferAssignmentsRepo {
    /// Creates assignments in bulk, keeping the payload order
    fn create_many(&self, payload: Vec<NewOfferAssignment>) -> RepoResult<Vec<OfferAssignment>>;

    /// Get assignment
    fn get(&self, id_arg: OfferAssignmentId) -> RepoResult<Option<OfferAssignment>>;

    /// Search assignments of every status, ordered by id
    fn find_by(&self, search: OfferAssignmentSearch) -> RepoResult<Vec<OfferAssignment>>;

    /// Moves the given assignments to a new status
    fn set_status(&self, ids: Vec<OfferAssignmentId>, status: OfferAssignmentStatus) -> RepoResult<Vec<OfferAssignment>>;
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> OfferAssignmentsRepoImpl<'a, T> {
    pub fn new(db_conn: &'a T) -> Self {
        Self { db_conn }
    }
}

impl<'a, T: Connection<Backend = Pg, TransactionManager = AnsiTransactionManager> + 'static> OfferAssignmentsRepo
    for OfferAssignmentsRepoImpl<'a, T>
{
    fn create_many(&self, payload: Vec<NewOfferAssignment>) -> RepoResult<Vec<OfferAssignment>> {
        debug!("Create {} new offer assignments.", payload.len());
        if payload.is_empty() {
            return Ok(vec![]);
        }
        let mut created = Vec::with_capacity(payload.len());
        for batch in payload.chunks(insert_batch_size(NEW_OFFER_ASSIGNMENT_COLUMNS)) {
            let values = diesel::insert_into(OfferAssignments::offer_assignments)
                .values(batch)
                .get_results::<OfferAssignment>(self.db_conn)
                .map_err(|e| e.context(format!("Creates {} new offer assignments error occurred", batch.len())))?;
            created.extend(values);
        }
        created.sort_by_key(|value| value.id);
        Ok(created)
    }

    fn get(&self, id_arg: OfferAssignmentId) -> RepoResult<Option<OfferAssignment>> {
        debug!("Find offer assignment with id {}.", id_arg);
        let query = OfferAssignments::offer_assignments.filter(OfferAssignments::id.eq(id_arg));
        query
            .get_result(self.db_conn)
            .optional()
            .map_err(|e| e.context(format!("Find offer assignment by id: {} error occurred", id_arg)).into())
    }

    fn find_by(&self, search: OfferAssignmentSearch) -> RepoResult<Vec<OfferAssignment>> {
        debug!("Get offer assignments by search: {:?}.", search);
        let mut query = OfferAssignments::offer_assignments.order(OfferAssignments::id).into_boxed();
        query = match search.clone() {
            OfferAssignmentSearch::Vouchers(voucher_ids) => query.filter(OfferAssignments::voucher_id.eq_any(voucher_ids)),
            OfferAssignmentSearch::Email(email) => query.filter(OfferAssignments::user_email.eq(email)),
        };

        query
            .get_results(self.db_conn)
            .map_err(|e| e.context(format!("Search offer assignments by {:?} failed.", search)).into())
    }

    fn set_status(&self, ids: Vec<OfferAssignmentId>, status_arg: OfferAssignmentStatus) -> RepoResult<Vec<OfferAssignment>> {
        debug!("Set status {} for offer assignments {:?}.", status_arg, ids);
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let filtered = OfferAssignments::offer_assignments.filter(OfferAssignments::id.eq_any(ids.clone()));
        let query = diesel::update(filtered).set((
            OfferAssignments::status.eq(status_arg),
            OfferAssignments::updated_at.eq(Utc::now()),
        ));
        query
            .get_results::<OfferAssignment>(self.db_conn)
            .map(|mut values| {
                values.sort_by_key(|value| value.id);
                values
            }).map_err(|e| {
                e.context(format!("Set status {} for offer assignments {:?} error occurred", status_arg, ids))
                    .into()
            })
    }
}
