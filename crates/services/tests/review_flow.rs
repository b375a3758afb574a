use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use flashdeck_core::model::{
    CardId, Flashcard, FlashcardDraft, SessionUser, UserId, ValidatedFlashcard,
};
use flashdeck_core::time::{fixed_clock, fixed_now};
use services::{
    ControllerError, DeleteEvent, DeleteSubmission, Navigation, ReviewController, StaticAuth,
};
use storage::repository::{FlashcardStore, InMemoryRepository, Storage, StorageError};
use tokio::sync::Semaphore;

fn user() -> SessionUser {
    SessionUser::new(UserId::random(), "reviewer@example.com")
}

/// Seeds `count` cards for `owner`. The collection lists them newest first: ids
/// `count..=1`.
fn seed(repo: &InMemoryRepository, owner: UserId, count: u64) {
    for id in 1..=count {
        let card = Flashcard::from_persisted(
            CardId::new(id),
            owner,
            format!("Q{id}"),
            format!("A{id}"),
            fixed_now(),
        )
        .expect("valid card");
        repo.insert(card).expect("insert");
    }
}

async fn open(user: &SessionUser, store: Arc<dyn FlashcardStore>) -> ReviewController {
    ReviewController::open(&StaticAuth::signed_in(user.clone()), store)
        .await
        .expect("open controller")
}

fn current_id(ctrl: &ReviewController) -> Option<u64> {
    ctrl.projection().current.map(|c| c.id.value())
}

/// Holds every `delete` until the test opens the gate.
struct GatedStore {
    inner: InMemoryRepository,
    gate: Arc<Semaphore>,
}

#[async_trait]
impl FlashcardStore for GatedStore {
    async fn fetch_all(&self, owner: UserId) -> Result<Vec<Flashcard>, StorageError> {
        self.inner.fetch_all(owner).await
    }

    async fn fetch_one(&self, id: CardId) -> Result<Option<Flashcard>, StorageError> {
        self.inner.fetch_one(id).await
    }

    async fn delete(&self, id: CardId, owner: UserId) -> Result<u64, StorageError> {
        let _permit = self.gate.acquire().await.expect("gate closed");
        self.inner.delete(id, owner).await
    }

    async fn create(
        &self,
        owner: UserId,
        card: ValidatedFlashcard,
    ) -> Result<Flashcard, StorageError> {
        self.inner.create(owner, card).await
    }
}

/// Snapshots `fetch_all` immediately, then holds the result until the gate opens once
/// `hold` is set.
struct StaleListStore {
    inner: InMemoryRepository,
    hold: AtomicBool,
    gate: Semaphore,
}

#[async_trait]
impl FlashcardStore for StaleListStore {
    async fn fetch_all(&self, owner: UserId) -> Result<Vec<Flashcard>, StorageError> {
        let snapshot = self.inner.fetch_all(owner).await;
        if self.hold.load(Ordering::SeqCst) {
            self.gate.acquire().await.expect("gate closed").forget();
        }
        snapshot
    }

    async fn fetch_one(&self, id: CardId) -> Result<Option<Flashcard>, StorageError> {
        self.inner.fetch_one(id).await
    }

    async fn delete(&self, id: CardId, owner: UserId) -> Result<u64, StorageError> {
        self.inner.delete(id, owner).await
    }

    async fn create(
        &self,
        owner: UserId,
        card: ValidatedFlashcard,
    ) -> Result<Flashcard, StorageError> {
        self.inner.create(owner, card).await
    }
}

#[derive(Clone, Copy)]
enum Fault {
    PanicOnFetch,
    FetchError,
    DeleteError,
    ZeroRows,
}

struct FaultyStore {
    inner: InMemoryRepository,
    fault: Fault,
}

#[async_trait]
impl FlashcardStore for FaultyStore {
    async fn fetch_all(&self, owner: UserId) -> Result<Vec<Flashcard>, StorageError> {
        self.inner.fetch_all(owner).await
    }

    async fn fetch_one(&self, id: CardId) -> Result<Option<Flashcard>, StorageError> {
        match self.fault {
            Fault::PanicOnFetch => panic!("store exploded"),
            Fault::FetchError => Err(StorageError::Connection("network unreachable".into())),
            Fault::DeleteError | Fault::ZeroRows => self.inner.fetch_one(id).await,
        }
    }

    async fn delete(&self, id: CardId, owner: UserId) -> Result<u64, StorageError> {
        match self.fault {
            Fault::DeleteError => Err(StorageError::Connection("disk on fire".into())),
            Fault::ZeroRows => Ok(0),
            Fault::PanicOnFetch | Fault::FetchError => self.inner.delete(id, owner).await,
        }
    }

    async fn create(
        &self,
        owner: UserId,
        card: ValidatedFlashcard,
    ) -> Result<Flashcard, StorageError> {
        self.inner.create(owner, card).await
    }
}

fn faulty(owner: UserId, fault: Fault) -> (InMemoryRepository, Arc<dyn FlashcardStore>) {
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, owner, 3);
    let store: Arc<dyn FlashcardStore> = Arc::new(FaultyStore {
        inner: repo.clone(),
        fault,
    });
    (repo, store)
}

fn gated(owner: UserId, count: u64) -> (InMemoryRepository, Arc<Semaphore>, Arc<dyn FlashcardStore>) {
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, owner, count);
    let gate = Arc::new(Semaphore::new(0));
    let store: Arc<dyn FlashcardStore> = Arc::new(GatedStore {
        inner: repo.clone(),
        gate: Arc::clone(&gate),
    });
    (repo, gate, store)
}

#[tokio::test]
async fn open_requires_a_signed_in_user() {
    let storage = Storage::in_memory();
    let err = ReviewController::open(&StaticAuth::signed_out(), storage.flashcards)
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Unauthenticated));
}

#[tokio::test]
async fn open_loads_only_own_cards_newest_first() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 3);
    repo.insert(
        Flashcard::from_persisted(
            CardId::new(10),
            UserId::random(),
            "theirs".into(),
            "x".into(),
            fixed_now(),
        )
        .unwrap(),
    )
    .unwrap();

    let ctrl = open(&me, Arc::new(repo)).await;
    let view = ctrl.projection();
    let ids: Vec<_> = view.cards.iter().map(|c| c.id.value()).collect();
    assert_eq!(ids, vec![3, 2, 1]);
    assert_eq!(view.position, Some(1));
    assert!(!view.answer_revealed);
}

#[tokio::test]
async fn navigation_wraps_and_resets_reveal() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 3);
    let ctrl = open(&me, Arc::new(repo)).await;

    assert!(ctrl.toggle_answer());
    assert!(ctrl.navigate(Navigation::Previous).unwrap());
    assert_eq!(current_id(&ctrl), Some(1));
    assert!(!ctrl.projection().answer_revealed);

    assert!(ctrl.navigate(Navigation::Next).unwrap());
    assert_eq!(current_id(&ctrl), Some(3));

    let err = ctrl.navigate(Navigation::Index(3)).unwrap_err();
    assert!(matches!(err, ControllerError::Collection(_)));
    assert_eq!(current_id(&ctrl), Some(3));
}

#[tokio::test]
async fn deleting_the_last_card_empties_the_session() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 1);
    let ctrl = open(&me, Arc::new(repo.clone())).await;

    let event = ctrl.request_delete(CardId::new(1)).await;
    assert_eq!(event, DeleteEvent::Completed);

    let view = ctrl.projection();
    assert!(view.is_empty);
    assert!(view.current.is_none());
    assert_eq!(view.position, None);
    assert_eq!(view.deleting, None);
    assert_eq!(repo.len().unwrap(), 0);
}

#[tokio::test]
async fn removal_keeps_cursor_on_a_sensible_card() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 4);
    let ctrl = open(&me, Arc::new(repo)).await;

    // Collection is [4, 3, 2, 1]; stand on 2 and delete 4 before it.
    ctrl.navigate(Navigation::Index(2)).unwrap();
    assert_eq!(ctrl.request_delete(CardId::new(4)).await, DeleteEvent::Completed);
    assert_eq!(current_id(&ctrl), Some(2));
    assert_eq!(ctrl.projection().position, Some(2));

    // Deleting the current last card moves to the new last.
    ctrl.navigate(Navigation::Index(2)).unwrap();
    assert_eq!(current_id(&ctrl), Some(1));
    assert_eq!(ctrl.request_delete(CardId::new(1)).await, DeleteEvent::Completed);
    assert_eq!(current_id(&ctrl), Some(2));

    // Deleting the current middle card shows its successor.
    ctrl.navigate(Navigation::Index(0)).unwrap();
    assert_eq!(ctrl.request_delete(CardId::new(3)).await, DeleteEvent::Completed);
    assert_eq!(current_id(&ctrl), Some(2));
    assert_eq!(ctrl.projection().total, 1);
}

#[tokio::test]
async fn second_delete_is_denied_while_first_is_pending() {
    let me = user();
    let (repo, gate, store) = gated(me.id, 3);
    let ctrl = open(&me, store).await;

    let first = ctrl.submit_delete(CardId::new(3));
    assert_eq!(first.event(), DeleteEvent::AcceptedAndPending);

    let view = ctrl.projection();
    assert_eq!(view.deleting, Some(CardId::new(3)));
    assert!(!view.delete_enabled(CardId::new(1)));

    let second = ctrl.submit_delete(CardId::new(1));
    assert!(matches!(second, DeleteSubmission::DeniedBusy));
    let same_again = ctrl.submit_delete(CardId::new(3));
    assert!(matches!(same_again, DeleteSubmission::DeniedBusy));
    assert_eq!(
        ctrl.request_delete(CardId::new(2)).await,
        DeleteEvent::DeniedBusy
    );

    gate.add_permits(1);
    let DeleteSubmission::Pending(handle) = first else {
        panic!("first delete should be pending");
    };
    assert_eq!(handle.await.unwrap(), DeleteEvent::Completed);

    let view = ctrl.projection();
    assert_eq!(view.deleting, None);
    assert!(view.delete_enabled(CardId::new(1)));
    assert_eq!(view.total, 2);
    assert_eq!(repo.len().unwrap(), 2);
}

#[tokio::test]
async fn concurrent_requests_admit_exactly_one() {
    let me = user();
    let (repo, gate, store) = gated(me.id, 2);
    let ctrl = open(&me, store).await;

    let (first, second, ()) = tokio::join!(
        ctrl.request_delete(CardId::new(2)),
        ctrl.request_delete(CardId::new(1)),
        async {
            tokio::task::yield_now().await;
            gate.add_permits(1);
        }
    );

    assert_eq!(first, DeleteEvent::Completed);
    assert_eq!(second, DeleteEvent::DeniedBusy);
    assert_eq!(repo.len().unwrap(), 1);
    assert_eq!(current_id(&ctrl), Some(1));
}

#[tokio::test]
async fn foreign_card_is_rejected_without_touching_the_store() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 1);
    repo.insert(
        Flashcard::from_persisted(
            CardId::new(7),
            UserId::random(),
            "Q".into(),
            "A".into(),
            fixed_now(),
        )
        .unwrap(),
    )
    .unwrap();
    let ctrl = open(&me, Arc::new(repo.clone())).await;

    let event = ctrl.request_delete(CardId::new(7)).await;
    assert_eq!(event, DeleteEvent::RejectedNotOwner);
    assert!(event.is_rejection());
    assert_eq!(repo.len().unwrap(), 2);
    assert_eq!(ctrl.projection().deleting, None);
}

#[tokio::test]
async fn vanished_card_is_reported_gone_and_left_for_refresh() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 2);
    let ctrl = open(&me, Arc::new(repo.clone())).await;

    assert_eq!(repo.delete(CardId::new(2), me.id).await.unwrap(), 1);

    assert_eq!(
        ctrl.request_delete(CardId::new(2)).await,
        DeleteEvent::RejectedGone
    );
    let view = ctrl.projection();
    assert_eq!(view.total, 2);
    assert_eq!(view.deleting, None);
    assert!(view.delete_enabled(CardId::new(1)));

    assert_eq!(
        ctrl.request_delete(CardId::new(1)).await,
        DeleteEvent::Completed
    );
    assert_eq!(ctrl.refresh().await.unwrap(), 0);
    assert!(ctrl.projection().is_empty);
}

#[tokio::test]
async fn store_error_is_reported_and_guard_released() {
    let me = user();
    let (_repo, store) = faulty(me.id, Fault::DeleteError);
    let ctrl = open(&me, store).await;
    ctrl.navigate(Navigation::Index(1)).unwrap();

    let event = ctrl.request_delete(CardId::new(2)).await;
    assert_eq!(
        event,
        DeleteEvent::RejectedDeleteFailed {
            detail: "Failed to delete flashcard: connection error: disk on fire".into()
        }
    );

    let view = ctrl.projection();
    assert_eq!(view.total, 3);
    assert_eq!(view.position, Some(2));
    assert_eq!(view.deleting, None);
}

#[tokio::test]
async fn failed_existence_check_is_reported_and_guard_released() {
    let me = user();
    let (repo, store) = faulty(me.id, Fault::FetchError);
    let ctrl = open(&me, store).await;

    let event = ctrl.request_delete(CardId::new(3)).await;
    assert_eq!(
        event,
        DeleteEvent::RejectedDeleteFailed {
            detail: "Failed to verify flashcard existence: connection error: network unreachable"
                .into()
        }
    );
    assert_eq!(repo.len().unwrap(), 3);

    let view = ctrl.projection();
    assert_eq!(view.total, 3);
    assert_eq!(view.deleting, None);
    assert!(view.delete_enabled(CardId::new(3)));
}

#[tokio::test]
async fn zero_affected_rows_is_a_failure() {
    let me = user();
    let (repo, store) = faulty(me.id, Fault::ZeroRows);
    let ctrl = open(&me, store).await;

    let event = ctrl.request_delete(CardId::new(3)).await;
    assert!(matches!(event, DeleteEvent::RejectedDeleteFailed { .. }));
    assert_eq!(ctrl.projection().total, 3);
    assert_eq!(repo.len().unwrap(), 3);
}

#[tokio::test]
async fn panicking_store_still_releases_guard() {
    let me = user();
    let (_repo, store) = faulty(me.id, Fault::PanicOnFetch);
    let ctrl = open(&me, store).await;

    let DeleteSubmission::Pending(handle) = ctrl.submit_delete(CardId::new(1)) else {
        panic!("delete should be admitted");
    };
    let err = handle.await.unwrap_err();
    assert!(err.is_panic());

    assert_eq!(ctrl.projection().deleting, None);
    assert!(matches!(
        ctrl.submit_delete(CardId::new(2)),
        DeleteSubmission::Pending(_)
    ));
}

#[tokio::test]
async fn refresh_during_pending_delete_is_reconciled() {
    let me = user();
    let (_repo, gate, store) = gated(me.id, 2);
    let ctrl = open(&me, store).await;

    let DeleteSubmission::Pending(handle) = ctrl.submit_delete(CardId::new(2)) else {
        panic!("delete should be admitted");
    };
    assert_eq!(ctrl.refresh().await.unwrap(), 2);

    gate.add_permits(1);
    assert_eq!(handle.await.unwrap(), DeleteEvent::Completed);
    let view = ctrl.projection();
    assert_eq!(view.total, 1);
    assert_eq!(current_id(&ctrl), Some(1));
}

#[tokio::test]
async fn slow_refresh_does_not_bring_back_a_deleted_card() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 2);
    let store = Arc::new(StaleListStore {
        inner: repo.clone(),
        hold: AtomicBool::new(false),
        gate: Semaphore::new(0),
    });
    let ctrl = open(&me, Arc::clone(&store) as Arc<dyn FlashcardStore>).await;
    store.hold.store(true, Ordering::SeqCst);

    let (refreshed, ()) = tokio::join!(ctrl.refresh(), async {
        assert_eq!(
            ctrl.request_delete(CardId::new(2)).await,
            DeleteEvent::Completed
        );
        store.gate.add_permits(1);
    });

    assert_eq!(refreshed.unwrap(), 1);
    let view = ctrl.projection();
    let ids: Vec<_> = view.cards.iter().map(|c| c.id.value()).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(repo.len().unwrap(), 1);
}

#[tokio::test]
async fn closing_with_a_pending_delete_is_safe() {
    let me = user();
    let (repo, gate, store) = gated(me.id, 2);
    let ctrl = open(&me, store).await;

    let DeleteSubmission::Pending(handle) = ctrl.submit_delete(CardId::new(1)) else {
        panic!("delete should be admitted");
    };
    ctrl.close();

    gate.add_permits(1);
    assert_eq!(handle.await.unwrap(), DeleteEvent::Completed);
    assert_eq!(repo.len().unwrap(), 1);
}

#[tokio::test]
async fn create_card_reloads_the_collection() {
    let me = user();
    let ctrl = open(&me, Arc::new(InMemoryRepository::with_clock(fixed_clock()))).await;
    assert!(ctrl.projection().is_empty);

    let card = ctrl
        .create_card(FlashcardDraft::new("  What is ownership? ", "Move semantics"))
        .await
        .expect("create");
    assert_eq!(card.question(), "What is ownership?");

    let view = ctrl.projection();
    assert_eq!(view.total, 1);
    assert_eq!(view.display_text.as_deref(), Some("What is ownership?"));

    let err = ctrl
        .create_card(FlashcardDraft::new("Q", "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Cards(_)));
    assert_eq!(ctrl.projection().total, 1);
}

#[tokio::test]
async fn projection_serializes_for_renderers() {
    let me = user();
    let repo = InMemoryRepository::with_clock(fixed_clock());
    seed(&repo, me.id, 2);
    let ctrl = open(&me, Arc::new(repo)).await;
    ctrl.toggle_answer();

    let json = serde_json::to_value(ctrl.projection()).expect("serialize");
    assert_eq!(json["total"], 2);
    assert_eq!(json["display_text"], "A2");
    assert_eq!(json["current"]["id"], 2);
    assert_eq!(json["cards"][0]["is_current"], true);
    assert_eq!(json["cards"][1]["delete_enabled"], true);
    assert!(json["deleting"].is_null());
}

#[tokio::test]
async fn sqlite_backed_session_round_trip() {
    let storage = Storage::sqlite("sqlite:file:memdb_review_flow?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let me = user();
    let ctrl = open(&me, Arc::clone(&storage.flashcards)).await;

    let first = ctrl
        .create_card(FlashcardDraft::new("Q1", "A1"))
        .await
        .expect("create first");
    let second = ctrl
        .create_card(FlashcardDraft::new("Q2", "A2"))
        .await
        .expect("create second");
    assert_eq!(ctrl.projection().total, 2);

    assert_eq!(ctrl.request_delete(first.id()).await, DeleteEvent::Completed);

    let remaining = storage.flashcards.fetch_all(me.id).await.expect("fetch");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id(), second.id());
    assert_eq!(current_id(&ctrl), Some(second.id().value()));
}
