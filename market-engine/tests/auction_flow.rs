//! End-to-end auction lifecycle tests: listing creation and fees,
//! outbid refunds with anti-sniping, buy-now settlement, expiry, and the
//! off-season conversion paths.

mod common;

use chrono::Duration;
use common::{credits, Fixture};
use market_domain::{HistoryAction, ListingStatus};
use market_engine::{AuctionError, SeasonClock};
use rust_decimal_macros::dec;
use uuid::Uuid;

// =============================================================================
// Listing creation
// =============================================================================

#[tokio::test]
async fn test_create_listing_charges_fee_on_buy_now_basis() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();

    // 3% of the 5000 buy-now price
    assert_eq!(listing.listing_fee.as_decimal(), dec!(150));
    assert_eq!(listing.status, ListingStatus::Active);
    assert_eq!(listing.expires_at, listing.original_expires_at);

    let balances = fx.balances(seller).await;
    assert_eq!(balances.credits.as_decimal(), dec!(9850));
    assert!(balances.escrow_credits.is_zero());

    let history = fx.engine.get_history(listing.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, HistoryAction::ListingCreated);
    assert_eq!(history[0].team_id, Some(seller));
    assert_eq!(history[0].amount, Some(credits(dec!(150))));
}

#[tokio::test]
async fn test_create_listing_fee_falls_back_to_start_bid() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(2000)), None, 24)
        .await
        .unwrap();

    // 3% of the 2000 start bid
    assert_eq!(listing.listing_fee.as_decimal(), dec!(60));
    assert_eq!(fx.balances(seller).await.credits.as_decimal(), dec!(9940));
}

#[tokio::test]
async fn test_create_listing_rejects_unowned_player() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = Uuid::now_v7(); // not assigned to anyone

    let result = fx.engine.create_listing(player, seller, credits(dec!(1000)), None, 24).await;
    assert!(matches!(result, Err(AuctionError::NotOwner)));
}

#[tokio::test]
async fn test_create_listing_rejects_double_listing() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    fx.engine.create_listing(player, seller, credits(dec!(1000)), None, 24).await.unwrap();

    let result = fx.engine.create_listing(player, seller, credits(dec!(1000)), None, 24).await;
    assert!(matches!(result, Err(AuctionError::AlreadyListed)));

    // Only one fee was charged
    assert_eq!(fx.balances(seller).await.credits.as_decimal(), dec!(9970));
}

#[tokio::test]
async fn test_create_listing_rejects_roster_minimum_violation() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);
    fx.roster.set_minimum_veto(seller, true);

    let result = fx.engine.create_listing(player, seller, credits(dec!(1000)), None, 24).await;
    assert!(matches!(result, Err(AuctionError::RosterConstraint(_))));
    // No fee charged on rejection
    assert_eq!(fx.balances(seller).await.credits.as_decimal(), dec!(10000));
}

#[tokio::test]
async fn test_create_listing_rejects_buy_now_below_floor() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);
    fx.valuation.set_floor(player, credits(dec!(3000)));

    let result = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(2999))), 24)
        .await;
    match result {
        Err(AuctionError::BuyNowBelowFloor { floor }) => {
            assert_eq!(floor.as_decimal(), dec!(3000));
        },
        other => panic!("expected BuyNowBelowFloor, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_listing_requires_fee_funds() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(100)).await;
    let player = fx.give_player(seller);

    let result = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await;
    assert!(matches!(result, Err(AuctionError::InsufficientFunds { .. })));
}

#[tokio::test]
async fn test_create_listing_rejects_bad_duration() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let result = fx.engine.create_listing(player, seller, credits(dec!(1000)), None, 0).await;
    assert!(matches!(result, Err(AuctionError::Domain(_))));
}

// =============================================================================
// Bidding: outbid refunds and anti-sniping
// =============================================================================

#[tokio::test]
async fn test_outbid_refund_and_single_snipe_extension() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let team_a = fx.seed_team(dec!(10000)).await;
    let team_b = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();
    let original_expiry = listing.expires_at;

    // First bid, well outside the snipe window
    fx.engine.place_bid(listing.id, team_a, credits(dec!(1000))).await.unwrap();
    assert_eq!(fx.balances(team_a).await.escrow_credits.as_decimal(), dec!(1000));

    // Second bid lands inside the trailing 5 minutes
    fx.clock.set_now(original_expiry - Duration::minutes(2));
    fx.engine.place_bid(listing.id, team_b, credits(dec!(1100))).await.unwrap();

    // A is made whole, B's escrow holds the new amount
    let a = fx.balances(team_a).await;
    assert_eq!(a.credits.as_decimal(), dec!(10000));
    assert!(a.escrow_credits.is_zero());
    let b = fx.balances(team_b).await;
    assert_eq!(b.credits.as_decimal(), dec!(8900));
    assert_eq!(b.escrow_credits.as_decimal(), dec!(1100));

    // Exactly one winning bid
    let bids = fx.engine.bids(listing.id).await.unwrap();
    assert_eq!(bids.len(), 2);
    let winners: Vec<_> = bids.iter().filter(|b| b.is_winning && !b.is_refunded).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].bidder_team_id, team_b);

    // Exactly one extension of the configured increment
    let updated = fx.engine.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(updated.extension_count, 1);
    assert_eq!(updated.expires_at, original_expiry + Duration::minutes(5));
    assert_eq!(updated.original_expires_at, original_expiry);

    let history = fx.engine.get_history(listing.id).await.unwrap();
    let actions: Vec<_> = history.iter().map(|e| e.action).collect();
    assert!(actions.contains(&HistoryAction::BidOutbid));
    assert!(actions.contains(&HistoryAction::AuctionExtended));

    fx.assert_escrow_consistent(&[seller, team_a, team_b]).await;
}

#[tokio::test]
async fn test_extension_budget_is_bounded() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let bidder = fx.seed_team(dec!(50000)).await;
    let rival = fx.seed_team(dec!(50000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();

    // Trade bids inside the window until the budget runs out. Each
    // extension pushes the window out, so the clock chases the expiry.
    let mut amount = dec!(1000);
    for i in 0..6 {
        let current = fx.engine.get_listing(listing.id).await.unwrap().unwrap();
        fx.clock.set_now(current.expires_at - Duration::minutes(1));
        let team = if i % 2 == 0 { bidder } else { rival };
        fx.engine.place_bid(listing.id, team, credits(amount)).await.unwrap();
        amount += dec!(100);
    }

    let updated = fx.engine.get_listing(listing.id).await.unwrap().unwrap();
    assert_eq!(updated.extension_count, 3);
    assert_eq!(updated.expires_at, listing.expires_at + Duration::minutes(15));
}

#[tokio::test]
async fn test_bid_validation() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let bidder = fx.seed_team(dec!(10000)).await;
    let poor = fx.seed_team(dec!(100)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();

    // Below start bid
    match fx.engine.place_bid(listing.id, bidder, credits(dec!(999))).await {
        Err(AuctionError::BidTooLow { minimum }) => {
            assert_eq!(minimum.as_decimal(), dec!(1000));
        },
        other => panic!("expected BidTooLow, got {other:?}"),
    }

    // Seller on own listing
    let result = fx.engine.place_bid(listing.id, seller, credits(dec!(1000))).await;
    assert!(matches!(result, Err(AuctionError::SelfBid)));

    // Insufficient funds leave no trace
    let result = fx.engine.place_bid(listing.id, poor, credits(dec!(1000))).await;
    assert!(matches!(result, Err(AuctionError::InsufficientFunds { .. })));
    assert!(fx.engine.bids(listing.id).await.unwrap().is_empty());

    fx.engine.place_bid(listing.id, bidder, credits(dec!(1000))).await.unwrap();

    // Raise under the minimum increment
    match fx.engine.place_bid(listing.id, bidder, credits(dec!(1050))).await {
        Err(AuctionError::BidTooLow { minimum }) => {
            assert_eq!(minimum.as_decimal(), dec!(1100));
        },
        other => panic!("expected BidTooLow, got {other:?}"),
    }

    // Past expiry
    fx.clock.set_now(listing.expires_at + Duration::seconds(1));
    let result = fx.engine.place_bid(listing.id, bidder, credits(dec!(2000))).await;
    assert!(matches!(result, Err(AuctionError::ListingExpired)));

    // Unknown listing
    let result = fx.engine.place_bid(Uuid::now_v7(), bidder, credits(dec!(1000))).await;
    assert!(matches!(result, Err(AuctionError::ListingNotFound)));
}

// =============================================================================
// Buy-now settlement
// =============================================================================

#[tokio::test]
async fn test_buy_now_settles_refunds_and_moves_ownership() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let bidder = fx.seed_team(dec!(10000)).await;
    let buyer = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();
    fx.engine.place_bid(listing.id, bidder, credits(dec!(1200))).await.unwrap();

    let sold = fx.engine.buy_now(listing.id, buyer).await.unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);
    assert!(sold.escrow_amount.is_zero());

    // Displaced bidder made whole
    let b = fx.balances(bidder).await;
    assert_eq!(b.credits.as_decimal(), dec!(10000));
    assert!(b.escrow_credits.is_zero());

    // Buyer paid the full price
    let buyer_balances = fx.balances(buyer).await;
    assert_eq!(buyer_balances.credits.as_decimal(), dec!(5000));
    assert!(buyer_balances.escrow_credits.is_zero());

    // Seller nets 95% of 5000 on top of 10000 - 150 fee
    let seller_balances = fx.balances(seller).await;
    assert_eq!(seller_balances.credits.as_decimal(), dec!(14600));

    // Ownership moved
    assert_eq!(fx.roster.owner_of(player), Some(buyer));
    assert_eq!(fx.roster.transfers(), vec![(player, buyer)]);

    let history = fx.engine.get_history(listing.id).await.unwrap();
    let actions: Vec<_> = history.iter().map(|e| e.action).collect();
    assert!(actions.contains(&HistoryAction::BuyNowPurchase));
    assert!(actions.contains(&HistoryAction::AuctionWon));

    fx.assert_escrow_consistent(&[seller, bidder, buyer]).await;
}

#[tokio::test]
async fn test_buy_now_requires_a_price() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let buyer = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();

    let result = fx.engine.buy_now(listing.id, buyer).await;
    assert!(matches!(result, Err(AuctionError::NoBuyNowPrice)));
}

#[tokio::test]
async fn test_buy_now_rejected_after_sale() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let buyer = fx.seed_team(dec!(10000)).await;
    let late = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();
    fx.engine.buy_now(listing.id, buyer).await.unwrap();

    let result = fx.engine.buy_now(listing.id, late).await;
    assert!(matches!(
        result,
        Err(AuctionError::ListingNotActive { status: ListingStatus::Sold })
    ));
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_before_bids_keeps_fee() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();

    let cancelled = fx.engine.cancel_listing(listing.id, seller).await.unwrap();
    assert_eq!(cancelled.status, ListingStatus::Cancelled);

    // Fee stays burned
    assert_eq!(fx.balances(seller).await.credits.as_decimal(), dec!(9850));

    // Player can be listed again
    fx.engine.create_listing(player, seller, credits(dec!(1000)), None, 24).await.unwrap();
}

#[tokio::test]
async fn test_cancel_blocked_once_a_bid_lands() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let bidder = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();
    fx.engine.place_bid(listing.id, bidder, credits(dec!(1000))).await.unwrap();

    let result = fx.engine.cancel_listing(listing.id, seller).await;
    assert!(matches!(result, Err(AuctionError::BidsAlreadyPlaced)));
}

#[tokio::test]
async fn test_cancel_requires_seller() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let stranger = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();

    let result = fx.engine.cancel_listing(listing.id, stranger).await;
    assert!(matches!(result, Err(AuctionError::NotOwner)));
}

// =============================================================================
// Expiry close
// =============================================================================

#[tokio::test]
async fn test_zero_bid_expiry_keeps_fee_and_player() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();

    fx.clock.set_now(listing.expires_at + Duration::seconds(1));
    let expired = fx.engine.finalize_expired(listing.id).await.unwrap();
    assert_eq!(expired.status, ListingStatus::Expired);

    // Seller is out only the listing fee; the player never moved
    assert_eq!(fx.balances(seller).await.credits.as_decimal(), dec!(9850));
    assert_eq!(fx.roster.owner_of(player), Some(seller));
    assert!(fx.roster.transfers().is_empty());

    let history = fx.engine.get_history(listing.id).await.unwrap();
    let expired_event = history.iter().find(|e| e.action == HistoryAction::AuctionExpired).unwrap();
    assert!(expired_event.team_id.is_none());
}

#[tokio::test]
async fn test_expiry_with_winner_settles_like_buy_now() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let winner = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();
    fx.engine.place_bid(listing.id, winner, credits(dec!(2000))).await.unwrap();

    fx.clock.set_now(listing.expires_at + Duration::seconds(1));
    let sold = fx.engine.finalize_expired(listing.id).await.unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);

    // Winner paid 2000 from escrow, seller nets 1900 after 5% tax
    let w = fx.balances(winner).await;
    assert_eq!(w.credits.as_decimal(), dec!(8000));
    assert!(w.escrow_credits.is_zero());
    assert_eq!(fx.balances(seller).await.credits.as_decimal(), dec!(11870));

    assert_eq!(fx.roster.owner_of(player), Some(winner));
    fx.assert_escrow_consistent(&[seller, winner]).await;
}

#[tokio::test]
async fn test_finalize_before_expiry_is_a_no_op() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();

    let unchanged = fx.engine.finalize_expired(listing.id).await.unwrap();
    assert_eq!(unchanged.status, ListingStatus::Active);
}

// =============================================================================
// Off-season conversion and auto-delist
// =============================================================================

#[tokio::test]
async fn test_conversion_with_buy_now_refunds_and_downgrades() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let bidder = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();
    fx.engine.place_bid(listing.id, bidder, credits(dec!(1200))).await.unwrap();

    let converted = fx.engine.convert_off_season(listing.id).await.unwrap();
    assert_eq!(converted.status, ListingStatus::BuyNowOnly);
    assert!(converted.off_season_converted);
    assert_eq!(converted.auto_delist_at, Some(fx.clock.season_end()));
    assert!(converted.current_bid.is_none());

    // Bidder made whole
    let b = fx.balances(bidder).await;
    assert_eq!(b.credits.as_decimal(), dec!(10000));
    assert!(b.escrow_credits.is_zero());

    // Bidding is gone but buy-now still works
    let result = fx.engine.place_bid(listing.id, bidder, credits(dec!(2000))).await;
    assert!(matches!(result, Err(AuctionError::ListingNotActive { .. })));
    let sold = fx.engine.buy_now(listing.id, bidder).await.unwrap();
    assert_eq!(sold.status, ListingStatus::Sold);

    fx.assert_escrow_consistent(&[seller, bidder]).await;
}

#[tokio::test]
async fn test_conversion_without_buy_now_closes_the_listing() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let winner = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    // With a winning bid the forced close settles the sale
    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();
    fx.engine.place_bid(listing.id, winner, credits(dec!(1000))).await.unwrap();

    let closed = fx.engine.convert_off_season(listing.id).await.unwrap();
    assert_eq!(closed.status, ListingStatus::Sold);
    assert_eq!(fx.roster.owner_of(player), Some(winner));

    // Without bids it simply expires
    let other_player = fx.give_player(seller);
    let other = fx
        .engine
        .create_listing(other_player, seller, credits(dec!(1000)), None, 24)
        .await
        .unwrap();
    let closed = fx.engine.convert_off_season(other.id).await.unwrap();
    assert_eq!(closed.status, ListingStatus::Expired);

    fx.assert_escrow_consistent(&[seller, winner]).await;
}

#[tokio::test]
async fn test_auto_delist_at_season_end() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();
    fx.engine.convert_off_season(listing.id).await.unwrap();

    // Not due yet
    let unchanged = fx.engine.auto_delist(listing.id).await.unwrap();
    assert_eq!(unchanged.status, ListingStatus::BuyNowOnly);

    fx.clock.set_now(fx.clock.season_end() + Duration::seconds(1));
    let delisted = fx.engine.auto_delist(listing.id).await.unwrap();
    assert_eq!(delisted.status, ListingStatus::Cancelled);

    let history = fx.engine.get_history(listing.id).await.unwrap();
    let event = history.iter().find(|e| e.action == HistoryAction::AutoDelisted).unwrap();
    assert!(event.team_id.is_none());
}

// =============================================================================
// Lock bookkeeping
// =============================================================================

#[tokio::test]
async fn test_listing_locks_reclaimed_after_operations() {
    let fx = Fixture::new();
    let seller = fx.seed_team(dec!(10000)).await;
    let buyer = fx.seed_team(dec!(10000)).await;
    let player = fx.give_player(seller);

    let listing = fx
        .engine
        .create_listing(player, seller, credits(dec!(1000)), Some(credits(dec!(5000))), 24)
        .await
        .unwrap();
    fx.engine.place_bid(listing.id, buyer, credits(dec!(1000))).await.unwrap();
    fx.engine.buy_now(listing.id, buyer).await.unwrap();

    // Probing an unknown listing must not leave an entry behind either.
    assert!(fx.engine.buy_now(Uuid::now_v7(), buyer).await.is_err());

    assert_eq!(fx.engine.listing_lock_count(), 0);
}
