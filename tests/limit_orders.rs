//! Commit/reveal limit-order flows: placement, cancellation authority, and
//! the fill that routes across the pools of a pair in fee order.

use assert_matches::assert_matches;

use clmm_dex::dex::{
    AddLiquidityRequest, AmountSide, CancelLimitOrderRequest, CreatePoolRequest, ErrorKind,
    FillLimitOrderRequest, InMemoryHost, LimitOrderPreimage, PlaceLimitOrderRequest,
};
use clmm_dex::ledger::{Amount, TokenLedger};

const TOKEN_A: &str = "TOKEN:A";
const TOKEN_B: &str = "TOKEN:B";

fn fx(text: &str) -> Amount {
    Amount::from_decimal_str(text).unwrap()
}

fn funded_host() -> InMemoryHost {
    let mut host = InMemoryHost::new();
    host.clock.0 = 1_000;
    for user in ["alice", "maker", "trader", "admin"] {
        for token in [TOKEN_A, TOKEN_B] {
            host.tokens
                .mint(&user.to_string(), &token.to_string(), fx("100000000000"));
        }
    }
    host
}

fn create_pool_with_liquidity(
    host: &mut InMemoryHost,
    fee: u16,
    sqrt_price: &str,
    token1_amount: &str,
) {
    host.transact("maker", |dex| {
        dex.create_pool(CreatePoolRequest {
            token0: TOKEN_A.into(),
            token1: TOKEN_B.into(),
            fee,
            initial_sqrt_price: fx(sqrt_price),
            is_private: false,
            whitelist: Vec::new(),
        })
    })
    .unwrap();
    if token1_amount == "0" {
        return;
    }
    host.transact("maker", |dex| {
        dex.add_liquidity(AddLiquidityRequest {
            token0: TOKEN_A.into(),
            token1: TOKEN_B.into(),
            fee,
            tick_lower: -120_000,
            tick_upper: 120_000,
            amount: fx(token1_amount),
            amount_side: AmountSide::Token1,
            amount0_min: Amount::zero(),
            amount1_min: Amount::zero(),
            position_id: format!("maker-{fee}"),
        })
    })
    .unwrap();
}

/// Trader sells token1 (TOKEN:B) for token0, accepting at least 0.9 token0
/// per token1.
fn order(selling_amount: &str, buying_minimum: &str) -> LimitOrderPreimage {
    LimitOrderPreimage {
        owner: "trader".into(),
        selling_token: TOKEN_B.into(),
        buying_token: TOKEN_A.into(),
        selling_amount: fx(selling_amount),
        buying_minimum: fx(buying_minimum),
        buying_to_selling_ratio: fx("0.9"),
        expires: 2_000,
        commitment_nonce: "nonce-1".into(),
    }
}

fn place(host: &mut InMemoryHost, preimage: &LimitOrderPreimage) -> String {
    let hash = preimage.hash();
    host.transact("trader", |dex| {
        dex.place_limit_order(PlaceLimitOrderRequest {
            hash: hash.clone(),
            expires: preimage.expires,
        })
    })
    .unwrap()
}

#[test]
fn placing_the_same_commitment_twice_conflicts() {
    let mut host = funded_host();
    let preimage = order("100", "90");
    place(&mut host, &preimage);
    let result = host.transact("trader", |dex| {
        dex.place_limit_order(PlaceLimitOrderRequest {
            hash: preimage.hash(),
            expires: preimage.expires,
        })
    });
    assert_matches!(result, Err(e) if matches!(e.kind, ErrorKind::DuplicateCommitment));
}

#[test]
fn cancel_requires_owner_or_configured_admin() {
    let mut host = funded_host();
    let preimage = order("100", "90");
    place(&mut host, &preimage);

    let stranger = host.transact("maker", |dex| {
        dex.cancel_limit_order(CancelLimitOrderRequest {
            preimage: preimage.clone(),
        })
    });
    assert_matches!(stranger, Err(e) if matches!(e.kind, ErrorKind::Unauthorized));

    host.transact("admin", |dex| {
        dex.set_global_limit_order_config(vec!["admin".into()])
    })
    .unwrap();
    host.transact("admin", |dex| {
        dex.cancel_limit_order(CancelLimitOrderRequest {
            preimage: preimage.clone(),
        })
    })
    .unwrap();

    // Gone: a second cancel no longer finds it.
    let again = host.transact("trader", |dex| {
        dex.cancel_limit_order(CancelLimitOrderRequest { preimage })
    });
    assert_matches!(again, Err(e) if matches!(e.kind, ErrorKind::CommitmentNotFound));
}

#[test]
fn mismatched_preimage_reads_as_absent() {
    let mut host = funded_host();
    let preimage = order("100", "90");
    place(&mut host, &preimage);
    let mut tampered = preimage;
    tampered.selling_amount = fx("100.5");
    let result = host.transact("trader", |dex| {
        dex.fill_limit_order(FillLimitOrderRequest { preimage: tampered })
    });
    assert_matches!(result, Err(e) if matches!(e.kind, ErrorKind::CommitmentNotFound));
}

#[test]
fn expired_commitment_cannot_fill_but_can_cancel() {
    let mut host = funded_host();
    let preimage = order("100", "90");
    place(&mut host, &preimage);
    host.clock.0 = 3_000;

    let fill = host.transact("trader", |dex| {
        dex.fill_limit_order(FillLimitOrderRequest {
            preimage: preimage.clone(),
        })
    });
    assert_matches!(fill, Err(e) if matches!(e.kind, ErrorKind::CommitmentExpired));

    host.transact("trader", |dex| {
        dex.cancel_limit_order(CancelLimitOrderRequest { preimage })
    })
    .unwrap();
}

#[test]
fn fill_routes_across_pools_and_skips_unfavorable_venues() {
    let mut host = funded_host();
    // Fee-5 pool priced above the order's limit: sqrt 1.1 ⇒ price 1.21 of
    // token1 in token0 terms, worse than the 1/0.9 bound. It must be skipped.
    create_pool_with_liquidity(&mut host, 5, "1.1", "2000");
    // Favorable venues at par. The fee-30 pool is shallow enough to run
    // into the limit price; the fee-100 pool absorbs the rest.
    create_pool_with_liquidity(&mut host, 30, "1", "100");
    create_pool_with_liquidity(&mut host, 100, "1", "5000");

    let preimage = order("100", "90");
    place(&mut host, &preimage);

    let trader = "trader".to_string();
    let b_before = host.tokens.balance_of(&trader, &TOKEN_B.to_string());
    let a_before = host.tokens.balance_of(&trader, &TOKEN_A.to_string());
    let fee5_before = pool_sqrt_price(&mut host, 5);

    host.transact("trader", |dex| {
        dex.fill_limit_order(FillLimitOrderRequest {
            preimage: preimage.clone(),
        })
    })
    .unwrap();

    // Seller paid exactly the committed amount across the favorable pools.
    let b_after = host.tokens.balance_of(&trader, &TOKEN_B.to_string());
    assert_eq!(b_before - b_after, fx("100"));
    // And bought at least the minimum.
    let a_after = host.tokens.balance_of(&trader, &TOKEN_A.to_string());
    assert!(a_after - a_before >= fx("90"));

    // The unfavorable pool was left untouched.
    assert_eq!(pool_sqrt_price(&mut host, 5), fee5_before);
    // The favorable ones moved.
    assert!(pool_sqrt_price(&mut host, 30) > fx("1"));

    // Commitment consumed, fulfillment recorded.
    let refill = host.transact("trader", |dex| {
        dex.fill_limit_order(FillLimitOrderRequest {
            preimage: preimage.clone(),
        })
    });
    assert_matches!(refill, Err(e) if matches!(e.kind, ErrorKind::CommitmentNotFound));
    let fulfilled = fulfilled_order(&mut host, &preimage);
    assert_eq!(fulfilled.commitment_nonce, "nonce-1");
    assert!(fulfilled.quantity_bought >= fx("90"));
}

#[test]
fn unmet_minimum_rolls_the_whole_fill_back() {
    let mut host = funded_host();
    // One shallow favorable pool: far too little depth for the order.
    create_pool_with_liquidity(&mut host, 30, "1", "5");

    let preimage = order("100", "90");
    place(&mut host, &preimage);

    let trader = "trader".to_string();
    let b_before = host.tokens.balance_of(&trader, &TOKEN_B.to_string());
    let result = host.transact("trader", |dex| {
        dex.fill_limit_order(FillLimitOrderRequest {
            preimage: preimage.clone(),
        })
    });
    assert_matches!(result, Err(e) if matches!(e.kind, ErrorKind::LimitOrderMinimumNotMet { .. }));

    // Atomic abort: no balance moved, the pool did not shift, and the
    // commitment is still fillable later.
    assert_eq!(host.tokens.balance_of(&trader, &TOKEN_B.to_string()), b_before);
    assert_eq!(pool_sqrt_price(&mut host, 30), fx("1"));
    let cancel = host.transact("trader", |dex| {
        dex.cancel_limit_order(CancelLimitOrderRequest { preimage })
    });
    assert!(cancel.is_ok());
}

fn pool_sqrt_price(host: &mut InMemoryHost, fee: u16) -> Amount {
    host.transact("maker", |dex| dex.slot0(TOKEN_A, TOKEN_B, fee))
        .unwrap()
        .sqrt_price
}

fn fulfilled_order(
    host: &mut InMemoryHost,
    preimage: &LimitOrderPreimage,
) -> clmm_dex::dex::FulfilledOrderV0 {
    use clmm_dex::dex::limit_order::fulfilled_order_key;
    use clmm_dex::dex::FulfilledOrder;
    use clmm_dex::ledger::ObjectStoreExt;
    let record: Option<FulfilledOrder> = host
        .ledger
        .get_object(&fulfilled_order_key(&preimage.hash()))
        .unwrap();
    let FulfilledOrder::V0(order) = record.expect("fulfilled order stored");
    order
}
