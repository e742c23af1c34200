//! Generic controller for a searchable, paginated, editable remote
//! collection.
//!
//! The registry owns the page-local cache and every mutation path to it.
//! Requests are issued in action order but may resolve out of order; fetches
//! are stamped with a monotonic sequence number and only the most recently
//! issued one may commit, so a slow page load never overwrites a faster
//! later one. Create/update/delete are serialized by the submitting gate —
//! a second attempt while one is outstanding is rejected, not queued.

use crate::error::Error;
use crate::gateway::{Envelope, Gateway};
use labrec_core::page::{sanitize_page, sanitize_per_page};
use labrec_core::{FieldErrors, PageState, RangeDraft, RangePayload, ReferenceRange};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

/// How long a success notice stays visible before expiring on its own.
/// Error banners have no deadline; they persist until the next action.
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// A remote collection the registry can manage.
pub trait Resource {
    /// Item type held in the page-local cache.
    type Item: DeserializeOwned + Clone;
    /// Form state edited by the user.
    type Draft: Default + Clone;
    /// Validated request payload for create and update.
    type Payload: Serialize;

    /// Collection path, trailing slash included as the service expects.
    const COLLECTION: &'static str;
    /// Query parameter carrying the search term.
    const SEARCH_PARAM: &'static str;
    /// Human label used in notices.
    const LABEL: &'static str;

    fn id(item: &Self::Item) -> i64;
    fn to_draft(item: &Self::Item) -> Self::Draft;
    /// Client-side validation; the payload exists iff the error set is empty.
    fn check(draft: &Self::Draft) -> Result<Self::Payload, FieldErrors>;

    fn item_path(id: i64) -> String {
        format!("{}{id}", Self::COLLECTION)
    }
}

/// Reference ranges as managed by the admin view.
pub struct ReferenceRanges;

impl Resource for ReferenceRanges {
    type Item = ReferenceRange;
    type Draft = RangeDraft;
    type Payload = RangePayload;

    const COLLECTION: &'static str = "/api/reference_ranges/";
    const SEARCH_PARAM: &'static str = "parameter";
    const LABEL: &'static str = "reference range";

    fn id(item: &ReferenceRange) -> i64 {
        item.id
    }

    fn to_draft(item: &ReferenceRange) -> RangeDraft {
        RangeDraft::from_range(item)
    }

    fn check(draft: &RangeDraft) -> Result<RangePayload, FieldErrors> {
        draft.check()
    }
}

/// The registry instantiated for reference ranges.
pub type ReferenceRangeRegistry = Registry<ReferenceRanges>;

/// An issued fetch, stamped with its sequence number.
pub struct FetchTicket<R: Resource> {
    seq: u64,
    page: u32,
    per_page: u32,
    search_term: Option<String>,
    _resource: PhantomData<R>,
}

impl<R: Resource> FetchTicket<R> {
    /// Run the request. Hand the outcome back to [`Registry::commit_fetch`],
    /// which discards it if a later fetch has been issued meanwhile.
    pub async fn run(self, gateway: &Gateway) -> FetchOutcome<R> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(term) = &self.search_term {
            query.push((R::SEARCH_PARAM, term.clone()));
        }
        let result = gateway.get_page::<R::Item>(R::COLLECTION, &query).await;
        FetchOutcome {
            seq: self.seq,
            result,
        }
    }
}

/// Resolution of an issued fetch, carrying its sequence stamp.
pub struct FetchOutcome<R: Resource> {
    seq: u64,
    result: Result<Envelope<R::Item>, Error>,
}

enum WriteVerb {
    Create,
    Update(i64),
}

/// An accepted create/update holding the submitting gate until committed.
pub struct SubmitTicket<R: Resource> {
    verb: WriteVerb,
    payload: R::Payload,
}

impl<R: Resource> SubmitTicket<R> {
    pub async fn run(self, gateway: &Gateway) -> SubmitOutcome {
        let updated = matches!(self.verb, WriteVerb::Update(_));
        let result = match self.verb {
            WriteVerb::Update(id) => {
                gateway
                    .put_json::<serde_json::Value, _>(&R::item_path(id), &self.payload)
                    .await
            }
            WriteVerb::Create => {
                gateway
                    .post_json::<serde_json::Value, _>(R::COLLECTION, &self.payload)
                    .await
            }
        };
        SubmitOutcome {
            updated,
            result: result.map(|_| ()),
        }
    }
}

/// Resolution of a create/update.
pub struct SubmitOutcome {
    updated: bool,
    result: Result<(), Error>,
}

struct Notice {
    message: String,
    expires_at: Instant,
}

/// Client-side controller state for one remote collection.
pub struct Registry<R: Resource> {
    items: Vec<R::Item>,
    page: PageState,
    draft: R::Draft,
    editing_id: Option<i64>,
    field_errors: FieldErrors,
    submitting: bool,
    pending_remove: Option<i64>,
    error: Option<String>,
    notice: Option<Notice>,
    fetch_seq: u64,
}

impl<R: Resource> Default for Registry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Registry<R> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            page: PageState::default(),
            draft: R::Draft::default(),
            editing_id: None,
            field_errors: FieldErrors::default(),
            submitting: false,
            pending_remove: None,
            error: None,
            notice: None,
            fetch_seq: 0,
        }
    }

    pub fn items(&self) -> &[R::Item] {
        &self.items
    }

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn draft(&self) -> &R::Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut R::Draft {
        &mut self.draft
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing_id
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn pending_remove(&self) -> Option<i64> {
        self.pending_remove
    }

    /// The sticky error banner, if any. It persists until the next action.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The success notice, if it has not yet expired.
    pub fn notice(&mut self) -> Option<&str> {
        let expired = self
            .notice
            .as_ref()
            .is_some_and(|n| n.expires_at <= Instant::now());
        if expired {
            self.notice = None;
        }
        self.notice.as_ref().map(|n| n.message.as_str())
    }

    fn set_notice(&mut self, message: String) {
        self.notice = Some(Notice {
            message,
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    fn begin_action(&mut self) {
        self.error = None;
    }

    /// Issue a fetch of the current page. Supersedes any fetch still in
    /// flight: its outcome will be discarded at commit.
    pub fn begin_fetch(&mut self) -> FetchTicket<R> {
        self.fetch_seq += 1;
        FetchTicket {
            seq: self.fetch_seq,
            page: sanitize_page(self.page.page),
            per_page: sanitize_per_page(self.page.per_page),
            search_term: self.page.search_term.clone(),
            _resource: PhantomData,
        }
    }

    /// Apply a fetch outcome. A stale outcome — one superseded by a later
    /// `begin_fetch` — is discarded without touching any state; returns
    /// whether the outcome was applied. A current outcome replaces `items`
    /// and page state together on success, or records the error banner on
    /// failure leaving `items` untouched.
    pub fn commit_fetch(&mut self, outcome: FetchOutcome<R>) -> bool {
        if outcome.seq != self.fetch_seq {
            tracing::debug!(
                seq = outcome.seq,
                latest = self.fetch_seq,
                "discarding stale fetch response"
            );
            return false;
        }
        match outcome.result {
            Ok(envelope) => {
                self.items = envelope.data;
                self.page.apply(&envelope.pagination);
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
        true
    }

    /// Fetch and commit in one step.
    pub async fn refresh(&mut self, gateway: &Gateway) {
        let ticket = self.begin_fetch();
        let outcome = ticket.run(gateway).await;
        self.commit_fetch(outcome);
    }

    /// Update the search term — whitespace-only means no filter — resetting
    /// to the first page on change, then fetch.
    pub async fn search(&mut self, gateway: &Gateway, term: &str) {
        self.begin_action();
        self.page.set_search_term(term);
        self.refresh(gateway).await;
    }

    /// Step `delta` pages, clamped to `[1, pages]`, then fetch.
    pub async fn change_page(&mut self, gateway: &Gateway, delta: i64) {
        self.begin_action();
        self.page.page = self.page.page_after(delta);
        self.refresh(gateway).await;
    }

    /// Page size for subsequent fetches; out-of-range values fall back to
    /// the default.
    pub fn set_per_page(&mut self, per_page: u32) {
        self.page.per_page = sanitize_per_page(per_page);
    }

    /// Jump to an absolute page for the next fetch (1-based; zero falls back
    /// to the first page). Clamping against `pages` applies once the count is
    /// known, via [`Registry::change_page`].
    pub fn set_page(&mut self, page: u32) {
        self.page.page = sanitize_page(page);
    }

    /// Load an item into the draft for update. No row locking: concurrent
    /// edits elsewhere resolve last-write-wins.
    pub fn edit(&mut self, item: &R::Item) {
        self.draft = R::to_draft(item);
        self.editing_id = Some(R::id(item));
        self.field_errors = FieldErrors::default();
    }

    pub fn cancel_edit(&mut self) {
        self.draft = R::Draft::default();
        self.editing_id = None;
        self.field_errors = FieldErrors::default();
    }

    /// Validate the draft and, if acceptable, take the submitting gate.
    ///
    /// Returns `None` without touching the network when another write is
    /// already in flight (rejected, never queued) or when client-side
    /// validation fails — the errors land in `field_errors` for inline
    /// display.
    pub fn begin_submit(&mut self) -> Option<SubmitTicket<R>> {
        if self.submitting {
            tracing::debug!("submit rejected: a write is already in flight");
            return None;
        }
        self.begin_action();
        let payload = match R::check(&self.draft) {
            Ok(payload) => {
                self.field_errors = FieldErrors::default();
                payload
            }
            Err(errors) => {
                self.field_errors = errors;
                return None;
            }
        };
        self.submitting = true;
        Some(SubmitTicket {
            verb: match self.editing_id {
                Some(id) => WriteVerb::Update(id),
                None => WriteVerb::Create,
            },
            payload,
        })
    }

    /// Release the gate and apply a write outcome. Success clears the draft
    /// and editing state and sets the success notice; the caller must then
    /// refetch — the optimistic payload is never merged into `items`, so the
    /// cache cannot drift from server-side defaulting or concurrent edits.
    pub fn commit_submit(&mut self, outcome: SubmitOutcome) -> bool {
        self.submitting = false;
        match outcome.result {
            Ok(()) => {
                self.draft = R::Draft::default();
                self.editing_id = None;
                let verb = if outcome.updated { "updated" } else { "created" };
                self.set_notice(format!("{} {verb}", R::LABEL));
                true
            }
            Err(Error::Validation { message, details }) => {
                for (field, msg) in &details {
                    self.field_errors.insert(field, msg.clone());
                }
                self.error = Some(message);
                false
            }
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }

    /// Create or update from the current draft, then reconcile with the
    /// server by refetching.
    pub async fn submit(&mut self, gateway: &Gateway) -> bool {
        let Some(ticket) = self.begin_submit() else {
            return false;
        };
        let outcome = ticket.run(gateway).await;
        if self.commit_submit(outcome) {
            self.refresh(gateway).await;
            true
        } else {
            false
        }
    }

    /// Mark an item for deletion. Nothing is issued until
    /// [`Registry::confirm_remove`]; [`Registry::cancel_remove`] backs out.
    pub fn request_remove(&mut self, id: i64) {
        self.pending_remove = Some(id);
    }

    pub fn cancel_remove(&mut self) {
        self.pending_remove = None;
    }

    /// Issue the confirmed DELETE. Success refetches; failure surfaces the
    /// error banner and leaves `items` untouched.
    pub async fn confirm_remove(&mut self, gateway: &Gateway) -> bool {
        if self.submitting {
            tracing::debug!("remove rejected: a write is already in flight");
            return false;
        }
        let Some(id) = self.pending_remove.take() else {
            return false;
        };
        self.begin_action();
        self.submitting = true;
        let result = gateway.delete(&R::item_path(id)).await;
        self.submitting = false;
        match result {
            Ok(()) => {
                self.set_notice(format!("{} deleted", R::LABEL));
                self.refresh(gateway).await;
                true
            }
            Err(err) => {
                self.error = Some(err.to_string());
                false
            }
        }
    }
}
