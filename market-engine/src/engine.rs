//! Auction engine orchestration.
//!
//! Single entry point for every listing mutation. Each operation runs
//! inside the listing's critical section (an async mutex per listing,
//! acquired with a timeout) and drives the store through
//! `get_for_update`/`save`, retrying a bounded number of times when the
//! optimistic write loses. Ledger escrow is locked before the listing
//! write commits and released again if it fails, so a caller never
//! observes a partially applied operation.

use chrono::{DateTime, Utc};
use market_domain::{
    AuctionRules, Bid, Credits, HistoryAction, HistoryEvent, Listing, ListingId, ListingStatus,
    PlayerId, TeamId,
};
use market_ledger::{LedgerError, LedgerPort};
use market_store::{Store, VersionedListing};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::AuctionError;
use crate::ports::{RosterPort, SeasonClock, ValuationPort};
use crate::recorder::HistoryRecorder;

/// The marketplace auction engine.
pub struct AuctionEngine {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerPort>,
    recorder: HistoryRecorder,
    roster: Arc<dyn RosterPort>,
    valuation: Arc<dyn ValuationPort>,
    clock: Arc<dyn SeasonClock>,
    rules: AuctionRules,
    /// One async mutex per listing; all mutations serialize through it.
    listing_locks: StdMutex<HashMap<ListingId, Arc<AsyncMutex<()>>>>,
}

impl AuctionEngine {
    /// Wire up an engine over the given store, ledger, and collaborators.
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Arc<dyn LedgerPort>,
        roster: Arc<dyn RosterPort>,
        valuation: Arc<dyn ValuationPort>,
        clock: Arc<dyn SeasonClock>,
        rules: AuctionRules,
    ) -> Self {
        let recorder = HistoryRecorder::new(store.clone());
        Self {
            store,
            ledger,
            recorder,
            roster,
            valuation,
            clock,
            rules,
            listing_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// The rule set this engine runs with.
    pub fn rules(&self) -> &AuctionRules {
        &self.rules
    }

    /// Acquire the listing's critical section, bounded by the lock timeout.
    async fn lock_listing(&self, id: ListingId) -> Result<OwnedMutexGuard<()>, AuctionError> {
        let lock = {
            let mut locks = self.listing_locks.lock().unwrap();
            locks.entry(id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        match tokio::time::timeout(self.rules.lock_timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(listing_id = %id, "Timed out waiting for listing lock");
                Err(AuctionError::Contention)
            },
        }
    }

    /// Release the critical section and drop the map entry when no other
    /// task holds or waits on it, so the lock map stays bounded by the
    /// number of in-flight operations.
    fn unlock_listing(&self, id: ListingId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.listing_locks.lock().unwrap();
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    /// Number of per-listing lock entries currently retained.
    pub fn listing_lock_count(&self) -> usize {
        self.listing_locks.lock().unwrap().len()
    }

    // =========================================================================
    // Create Listing
    // =========================================================================

    /// List a player for auction.
    ///
    /// Charges the non-refundable listing fee up front. The buy-now floor
    /// comes from the valuation service, never from the caller.
    pub async fn create_listing(
        &self,
        player: PlayerId,
        seller: TeamId,
        start_bid: Credits,
        buy_now: Option<Credits>,
        duration_hours: i64,
    ) -> Result<Listing, AuctionError> {
        let now = self.clock.now();

        if !self.roster.is_owned_by(player, seller).await? {
            return Err(AuctionError::NotOwner);
        }
        if self.store.listings().find_active_by_player(player).await?.is_some() {
            return Err(AuctionError::AlreadyListed);
        }
        if self.roster.would_violate_minimum(seller, player).await? {
            return Err(AuctionError::RosterConstraint(
                "Sale would leave the roster under its required minimum".to_string(),
            ));
        }

        let floor = self.valuation.min_buy_now(player).await?;
        if let Some(price) = buy_now {
            if price < floor {
                return Err(AuctionError::BuyNowBelowFloor { floor });
            }
        }

        let duration = self.rules.validate_duration(duration_hours)?;
        let fee_basis = buy_now.unwrap_or(start_bid);
        let fee = self.rules.listing_fee(fee_basis);
        let listing = Listing::new(
            player,
            seller,
            start_bid,
            buy_now,
            floor,
            fee,
            self.rules.tax_rate,
            duration,
            now,
        )?;

        // Fee is charged before the insert; refund it if the insert loses
        // a race on the one-listing-per-player constraint.
        self.ledger.debit(seller, fee).await?;
        if let Err(err) = self.store.listings().create(&listing).await {
            if let Err(credit_err) = self.ledger.credit(seller, fee).await {
                tracing::error!(
                    %seller,
                    %fee,
                    error = %credit_err,
                    "Failed to refund listing fee after insert failure"
                );
                return Err(AuctionError::InvariantViolation(credit_err.to_string()));
            }
            return Err(err.into());
        }

        self.recorder
            .record(
                HistoryEvent::new(listing.id, HistoryAction::ListingCreated)
                    .with_team(seller)
                    .with_amount(fee),
            )
            .await;

        tracing::info!(
            listing_id = %listing.id,
            %player,
            %seller,
            %start_bid,
            %fee,
            "Listing created"
        );
        Ok(listing)
    }

    // =========================================================================
    // Place Bid
    // =========================================================================

    /// Place a bid on an active listing.
    ///
    /// Atomically refunds the outbid team, escrows the new amount, and
    /// applies an anti-snipe extension when the bid lands inside the
    /// trailing window.
    pub async fn place_bid(
        &self,
        listing_id: ListingId,
        bidder: TeamId,
        amount: Credits,
    ) -> Result<Bid, AuctionError> {
        let guard = self.lock_listing(listing_id).await?;
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.place_bid_once(listing_id, bidder, amount).await {
                Err(AuctionError::Contention) if attempts <= self.rules.max_retries => {
                    tracing::debug!(%listing_id, attempts, "Retrying bid after store conflict");
                },
                result => break result,
            }
        };
        self.unlock_listing(listing_id, guard);
        result
    }

    async fn place_bid_once(
        &self,
        listing_id: ListingId,
        bidder: TeamId,
        amount: Credits,
    ) -> Result<Bid, AuctionError> {
        let mut versioned = self.store.listings().get_for_update(listing_id).await?;
        let now = self.clock.now();

        let listing = &versioned.listing;
        if listing.status != ListingStatus::Active {
            return Err(AuctionError::ListingNotActive { status: listing.status });
        }
        if now >= listing.expires_at {
            return Err(AuctionError::ListingExpired);
        }
        if bidder == listing.seller_team_id {
            return Err(AuctionError::SelfBid);
        }
        if !self.rules.is_valid_raise(listing.start_bid, listing.current_bid, amount) {
            return Err(AuctionError::BidTooLow {
                minimum: self.rules.minimum_raise(listing.start_bid, listing.current_bid),
            });
        }

        let previous = self.store.bids().find_winning(listing_id).await?;

        // Escrow first; if the listing write fails the lock is reversed.
        self.ledger.lock(bidder, amount).await?;

        versioned.listing.record_high_bid(bidder, amount, now)?;
        let mut extension = None;
        if versioned.listing.in_snipe_window(now, &self.rules) {
            let old_expiry = versioned.listing.expires_at;
            if versioned.listing.extend(&self.rules, now) {
                extension = Some((old_expiry, versioned.listing.expires_at));
            }
        }

        if let Err(err) = self.store.listings().save(versioned).await {
            if let Err(release_err) = self.ledger.release(bidder, amount).await {
                tracing::error!(
                    %listing_id,
                    %bidder,
                    error = %release_err,
                    "Failed to reverse escrow lock after rejected save"
                );
                return Err(AuctionError::InvariantViolation(release_err.to_string()));
            }
            return Err(err.into());
        }

        // Committed. Refund the outbid team and swap the winning bid.
        // Between the save above and the bid rows landing below, a reader
        // outside this critical section can momentarily see the new
        // escrow without a matching bid row; escrow reconciliation is
        // only meaningful between operations, not during one.
        if let Some(mut prev) = previous {
            let refunded_team = prev.bidder_team_id;
            let refunded_amount = prev.amount;
            if let Err(release_err) = self.ledger.release(refunded_team, refunded_amount).await {
                tracing::error!(
                    %listing_id,
                    team = %refunded_team,
                    error = %release_err,
                    "Failed to refund outbid escrow"
                );
                return Err(AuctionError::InvariantViolation(release_err.to_string()));
            }
            prev.mark_refunded();
            self.store.bids().save(&prev).await?;

            self.recorder
                .record(
                    HistoryEvent::new(listing_id, HistoryAction::BidOutbid)
                        .with_team(refunded_team)
                        .with_amount(refunded_amount)
                        .with_change(refunded_amount.as_decimal(), amount.as_decimal()),
                )
                .await;
        }

        let bid = Bid::new(listing_id, bidder, amount, now);
        self.store.bids().save(&bid).await?;

        if let Some((from, to)) = extension {
            self.recorder
                .record(
                    HistoryEvent::new(listing_id, HistoryAction::AuctionExtended)
                        .with_change(Decimal::from(from.timestamp()), Decimal::from(to.timestamp())),
                )
                .await;
            tracing::info!(%listing_id, expires_at = %to, "Anti-snipe extension applied");
        }
        self.recorder
            .record(
                HistoryEvent::new(listing_id, HistoryAction::BidPlaced)
                    .with_team(bidder)
                    .with_amount(amount),
            )
            .await;

        tracing::info!(%listing_id, %bidder, %amount, "Bid accepted");
        Ok(bid)
    }

    // =========================================================================
    // Buy Now
    // =========================================================================

    /// Purchase a listing instantly at its buy-now price.
    pub async fn buy_now(
        &self,
        listing_id: ListingId,
        buyer: TeamId,
    ) -> Result<Listing, AuctionError> {
        let guard = self.lock_listing(listing_id).await?;
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.buy_now_once(listing_id, buyer).await {
                Err(AuctionError::Contention) if attempts <= self.rules.max_retries => {
                    tracing::debug!(%listing_id, attempts, "Retrying buy-now after store conflict");
                },
                result => break result,
            }
        };
        self.unlock_listing(listing_id, guard);
        result
    }

    async fn buy_now_once(
        &self,
        listing_id: ListingId,
        buyer: TeamId,
    ) -> Result<Listing, AuctionError> {
        let mut versioned = self.store.listings().get_for_update(listing_id).await?;
        let now = self.clock.now();

        let listing = &versioned.listing;
        match listing.status {
            ListingStatus::Active | ListingStatus::BuyNowOnly => {},
            status => return Err(AuctionError::ListingNotActive { status }),
        }
        if listing.status == ListingStatus::Active && now >= listing.expires_at {
            return Err(AuctionError::ListingExpired);
        }
        if listing.status == ListingStatus::BuyNowOnly {
            if let Some(delist_at) = listing.auto_delist_at {
                if now >= delist_at {
                    return Err(AuctionError::ListingExpired);
                }
            }
        }
        let price = listing.buy_now_price.ok_or(AuctionError::NoBuyNowPrice)?;
        if buyer == listing.seller_team_id {
            return Err(AuctionError::SelfBid);
        }

        let seller = listing.seller_team_id;
        let player = listing.player_id;
        let tax_rate = listing.tax_rate;
        let previous = self.store.bids().find_winning(listing_id).await?;

        self.ledger.lock(buyer, price).await?;

        versioned.listing.mark_sold(now)?;
        let result = versioned.listing.clone();
        if let Err(err) = self.store.listings().save(versioned).await {
            if let Err(release_err) = self.ledger.release(buyer, price).await {
                tracing::error!(
                    %listing_id,
                    %buyer,
                    error = %release_err,
                    "Failed to reverse buy-now escrow after rejected save"
                );
                return Err(AuctionError::InvariantViolation(release_err.to_string()));
            }
            return Err(err.into());
        }

        // Committed. Refund the displaced winner, settle, move the player.
        if let Some(mut prev) = previous {
            let refunded_team = prev.bidder_team_id;
            let refunded_amount = prev.amount;
            if let Err(release_err) = self.ledger.release(refunded_team, refunded_amount).await {
                tracing::error!(
                    %listing_id,
                    team = %refunded_team,
                    error = %release_err,
                    "Failed to refund winning bid on buy-now"
                );
                return Err(AuctionError::InvariantViolation(release_err.to_string()));
            }
            prev.mark_refunded();
            self.store.bids().save(&prev).await?;

            self.recorder
                .record(
                    HistoryEvent::new(listing_id, HistoryAction::BidOutbid)
                        .with_team(refunded_team)
                        .with_amount(refunded_amount)
                        .with_description("Refunded: listing purchased via buy-now"),
                )
                .await;
        }

        if let Err(transfer_err) = self.ledger.transfer(buyer, seller, price, tax_rate).await {
            tracing::error!(
                %listing_id,
                %buyer,
                %seller,
                error = %transfer_err,
                "Settlement transfer failed after listing marked sold"
            );
            return Err(AuctionError::InvariantViolation(transfer_err.to_string()));
        }
        if let Err(roster_err) = self.roster.transfer_ownership(player, buyer).await {
            tracing::error!(
                %listing_id,
                %player,
                %buyer,
                error = %roster_err,
                "Ownership transfer failed after settlement"
            );
            return Err(AuctionError::InvariantViolation(roster_err.to_string()));
        }

        self.recorder
            .record(
                HistoryEvent::new(listing_id, HistoryAction::BuyNowPurchase)
                    .with_team(buyer)
                    .with_amount(price),
            )
            .await;
        self.recorder
            .record(
                HistoryEvent::new(listing_id, HistoryAction::AuctionWon)
                    .with_team(buyer)
                    .with_amount(price),
            )
            .await;

        tracing::info!(%listing_id, %buyer, %price, "Buy-now purchase settled");
        Ok(result)
    }

    // =========================================================================
    // Cancel Listing
    // =========================================================================

    /// Withdraw a listing. Seller only, and only before any bid lands.
    /// The listing fee is not refunded.
    pub async fn cancel_listing(
        &self,
        listing_id: ListingId,
        caller: TeamId,
    ) -> Result<Listing, AuctionError> {
        let guard = self.lock_listing(listing_id).await?;
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.cancel_listing_once(listing_id, caller).await {
                Err(AuctionError::Contention) if attempts <= self.rules.max_retries => {
                    tracing::debug!(%listing_id, attempts, "Retrying cancel after store conflict");
                },
                result => break result,
            }
        };
        self.unlock_listing(listing_id, guard);
        result
    }

    async fn cancel_listing_once(
        &self,
        listing_id: ListingId,
        caller: TeamId,
    ) -> Result<Listing, AuctionError> {
        let mut versioned = self.store.listings().get_for_update(listing_id).await?;
        let now = self.clock.now();

        if caller != versioned.listing.seller_team_id {
            return Err(AuctionError::NotOwner);
        }
        match versioned.listing.status {
            ListingStatus::Active | ListingStatus::BuyNowOnly => {},
            status => return Err(AuctionError::ListingNotActive { status }),
        }

        // Any bid ever placed blocks cancellation, including bids cleared
        // by an off-season conversion.
        let bids = self.store.bids().find_by_listing(listing_id).await?;
        if !bids.is_empty() {
            return Err(AuctionError::BidsAlreadyPlaced);
        }

        versioned.listing.mark_cancelled(now)?;
        let result = versioned.listing.clone();
        self.store.listings().save(versioned).await?;

        self.recorder
            .record(
                HistoryEvent::new(listing_id, HistoryAction::ListingCancelled).with_team(caller),
            )
            .await;

        tracing::info!(%listing_id, %caller, "Listing cancelled");
        Ok(result)
    }

    // =========================================================================
    // Expiry / Close
    // =========================================================================

    /// Close an active listing that has passed its expiry.
    ///
    /// With a winning bid the sale settles exactly like buy-now; with
    /// none the listing expires. A listing that has not expired yet is
    /// returned unchanged.
    pub async fn finalize_expired(&self, listing_id: ListingId) -> Result<Listing, AuctionError> {
        let guard = self.lock_listing(listing_id).await?;
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.finalize_expired_once(listing_id).await {
                Err(AuctionError::Contention) if attempts <= self.rules.max_retries => {
                    tracing::debug!(%listing_id, attempts, "Retrying finalize after store conflict");
                },
                result => break result,
            }
        };
        self.unlock_listing(listing_id, guard);
        result
    }

    async fn finalize_expired_once(&self, listing_id: ListingId) -> Result<Listing, AuctionError> {
        let versioned = self.store.listings().get_for_update(listing_id).await?;
        let now = self.clock.now();

        if versioned.listing.status != ListingStatus::Active {
            return Err(AuctionError::ListingNotActive { status: versioned.listing.status });
        }
        if now < versioned.listing.expires_at {
            tracing::debug!(%listing_id, "Listing not yet expired, skipping");
            return Ok(versioned.listing);
        }

        self.close_listing(versioned, now).await
    }

    /// Shared close path: settle to the winning bidder, or expire.
    async fn close_listing(
        &self,
        mut versioned: VersionedListing,
        now: DateTime<Utc>,
    ) -> Result<Listing, AuctionError> {
        let listing_id = versioned.listing.id;
        let seller = versioned.listing.seller_team_id;
        let player = versioned.listing.player_id;
        let tax_rate = versioned.listing.tax_rate;

        let winning = self.store.bids().find_winning(listing_id).await?;
        match winning {
            Some(mut bid) => {
                let winner = bid.bidder_team_id;
                let amount = bid.amount;

                versioned.listing.mark_sold(now)?;
                let result = versioned.listing.clone();
                self.store.listings().save(versioned).await?;

                if let Err(transfer_err) =
                    self.ledger.transfer(winner, seller, amount, tax_rate).await
                {
                    tracing::error!(
                        %listing_id,
                        %winner,
                        %seller,
                        error = %transfer_err,
                        "Settlement transfer failed after listing marked sold"
                    );
                    return Err(AuctionError::InvariantViolation(transfer_err.to_string()));
                }
                bid.mark_settled();
                self.store.bids().save(&bid).await?;

                if let Err(roster_err) = self.roster.transfer_ownership(player, winner).await {
                    tracing::error!(
                        %listing_id,
                        %player,
                        %winner,
                        error = %roster_err,
                        "Ownership transfer failed after settlement"
                    );
                    return Err(AuctionError::InvariantViolation(roster_err.to_string()));
                }

                self.recorder
                    .record(
                        HistoryEvent::new(listing_id, HistoryAction::AuctionWon)
                            .with_team(winner)
                            .with_amount(amount),
                    )
                    .await;

                tracing::info!(%listing_id, %winner, %amount, "Auction settled to winning bidder");
                Ok(result)
            },
            None => {
                versioned.listing.mark_expired(now)?;
                let result = versioned.listing.clone();
                self.store.listings().save(versioned).await?;

                self.recorder
                    .record(HistoryEvent::new(listing_id, HistoryAction::AuctionExpired))
                    .await;

                tracing::info!(%listing_id, "Listing expired with no bids");
                Ok(result)
            },
        }
    }

    // =========================================================================
    // Off-Season Conversion
    // =========================================================================

    /// Downgrade an active listing at the season boundary.
    ///
    /// With a buy-now price the listing becomes BUY_NOW_ONLY until the
    /// season end, refunding the current high bidder. Without one it is
    /// force-closed through the shared close path.
    pub async fn convert_off_season(
        &self,
        listing_id: ListingId,
    ) -> Result<Listing, AuctionError> {
        let guard = self.lock_listing(listing_id).await?;
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.convert_off_season_once(listing_id).await {
                Err(AuctionError::Contention) if attempts <= self.rules.max_retries => {
                    tracing::debug!(%listing_id, attempts, "Retrying conversion after store conflict");
                },
                result => break result,
            }
        };
        self.unlock_listing(listing_id, guard);
        result
    }

    async fn convert_off_season_once(
        &self,
        listing_id: ListingId,
    ) -> Result<Listing, AuctionError> {
        let mut versioned = self.store.listings().get_for_update(listing_id).await?;
        let now = self.clock.now();

        if versioned.listing.status != ListingStatus::Active {
            return Err(AuctionError::ListingNotActive { status: versioned.listing.status });
        }

        if versioned.listing.buy_now_price.is_none() {
            return self.close_listing(versioned, now).await;
        }

        let winning = self.store.bids().find_winning(listing_id).await?;

        versioned.listing.convert_to_buy_now_only(self.clock.season_end(), now)?;
        let result = versioned.listing.clone();
        self.store.listings().save(versioned).await?;

        let mut refunded = None;
        if let Some(mut bid) = winning {
            let team = bid.bidder_team_id;
            let amount = bid.amount;
            if let Err(release_err) = self.ledger.release(team, amount).await {
                tracing::error!(
                    %listing_id,
                    %team,
                    error = %release_err,
                    "Failed to refund high bid on off-season conversion"
                );
                return Err(AuctionError::InvariantViolation(release_err.to_string()));
            }
            bid.mark_refunded();
            self.store.bids().save(&bid).await?;
            refunded = Some(amount);
        }

        let mut event = HistoryEvent::new(listing_id, HistoryAction::OffSeasonConverted);
        if let Some(amount) = refunded {
            event = event.with_amount(amount).with_description("High bid refunded");
        }
        self.recorder.record(event).await;

        tracing::info!(
            %listing_id,
            auto_delist_at = ?result.auto_delist_at,
            "Listing converted to buy-now only"
        );
        Ok(result)
    }

    // =========================================================================
    // Auto-Delist
    // =========================================================================

    /// Cancel a BUY_NOW_ONLY listing whose delist time has passed.
    /// A listing not yet due is returned unchanged.
    pub async fn auto_delist(&self, listing_id: ListingId) -> Result<Listing, AuctionError> {
        let guard = self.lock_listing(listing_id).await?;
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.auto_delist_once(listing_id).await {
                Err(AuctionError::Contention) if attempts <= self.rules.max_retries => {
                    tracing::debug!(%listing_id, attempts, "Retrying auto-delist after store conflict");
                },
                result => break result,
            }
        };
        self.unlock_listing(listing_id, guard);
        result
    }

    async fn auto_delist_once(&self, listing_id: ListingId) -> Result<Listing, AuctionError> {
        let mut versioned = self.store.listings().get_for_update(listing_id).await?;
        let now = self.clock.now();

        if versioned.listing.status != ListingStatus::BuyNowOnly {
            return Err(AuctionError::ListingNotActive { status: versioned.listing.status });
        }
        let due = versioned.listing.auto_delist_at.map(|at| at <= now).unwrap_or(false);
        if !due {
            tracing::debug!(%listing_id, "Auto-delist not due yet, skipping");
            return Ok(versioned.listing);
        }

        versioned.listing.mark_cancelled(now)?;
        let result = versioned.listing.clone();
        self.store.listings().save(versioned).await?;

        self.recorder
            .record(HistoryEvent::new(listing_id, HistoryAction::AutoDelisted))
            .await;

        tracing::info!(%listing_id, "Listing auto-delisted at season end");
        Ok(result)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a listing.
    pub async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, AuctionError> {
        Ok(self.store.listings().get(id).await?)
    }

    /// Full audit history for a listing, in append order.
    pub async fn get_history(&self, id: ListingId) -> Result<Vec<HistoryEvent>, AuctionError> {
        Ok(self.recorder.history(id).await?)
    }

    /// All bids on a listing, ordered by placement time.
    pub async fn bids(&self, id: ListingId) -> Result<Vec<Bid>, AuctionError> {
        Ok(self.store.bids().find_by_listing(id).await?)
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Verify that the ledger escrow for a team equals the sum of its
    /// outstanding winning bids.
    ///
    /// Only meaningful at rest: an operation in flight inside a listing's
    /// critical section may have moved escrow before its bid rows land,
    /// so run this between operations, not concurrently with them.
    pub async fn check_escrow_invariant(&self, team: TeamId) -> Result<(), AuctionError> {
        let bids = self.store.bids().find_winning_by_team(team).await?;
        let expected =
            bids.iter().fold(Credits::zero(), |acc, bid| acc.saturating_add(bid.escrow_amount));

        let balances = match self.ledger.balances(team).await {
            Ok(balances) => balances,
            Err(LedgerError::UnknownTeam(_)) if expected.is_zero() => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        if balances.escrow_credits != expected {
            tracing::error!(
                %team,
                expected = %expected,
                actual = %balances.escrow_credits,
                "Escrow invariant violated"
            );
            return Err(AuctionError::InvariantViolation(format!(
                "team {} escrow {} does not match outstanding bids {}",
                team, balances.escrow_credits, expected
            )));
        }
        Ok(())
    }
}
