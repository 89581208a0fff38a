//! Behavior tests for per-field observation resolution: caller wins
//! over fetched, fetched wins over synthetic, and each upstream
//! degrades independently of the other.

use highcast_tests::*;

fn fetcher(ohlcv: Arc<ScriptedOhlcv>, market_cap: Arc<ScriptedMarketCap>) -> ObservationFetcher {
    ObservationFetcher::new(ohlcv, market_cap)
}

#[tokio::test]
async fn when_candle_feed_is_empty_synthetic_prices_fill_in() {
    // Given: Kraken answers with an empty window, CoinGecko is healthy
    let ohlcv = Arc::new(ScriptedOhlcv::new());
    ohlcv.push(Ok(vec![]));
    let market_cap = Arc::new(ScriptedMarketCap::new());
    market_cap.push(Ok(610_000_000_000.0));

    // When: resolving with no caller overrides
    let date = parse_calendar_date("2023-01-01").expect("date");
    let observation = fetcher(ohlcv, market_cap)
        .resolve(date, &ObservationOverrides::default())
        .await
        .expect("resolution cannot fail");

    // Then: prices come from the documented synthetic offsets
    assert_eq!(observation.close, SYNTHETIC_CLOSE_USD);
    assert!((observation.open - SYNTHETIC_CLOSE_USD * SYNTHETIC_OPEN_RATIO).abs() < 1e-9);
    assert!((observation.high - SYNTHETIC_CLOSE_USD * SYNTHETIC_HIGH_RATIO).abs() < 1e-9);
    assert!((observation.low - SYNTHETIC_CLOSE_USD * SYNTHETIC_LOW_RATIO).abs() < 1e-9);
    assert_eq!(observation.volume, SYNTHETIC_VOLUME);

    // And: the healthy feed still contributes its field
    assert_eq!(observation.market_cap, 610_000_000_000.0);
}

#[tokio::test]
async fn when_cap_feed_dies_candle_fields_survive() {
    // Given: a healthy candle and a dead market-cap feed
    let ohlcv = Arc::new(ScriptedOhlcv::new());
    let candle = sample_candle("2023-01-01T00:00:05Z");
    ohlcv.push(Ok(vec![candle]));
    let market_cap = Arc::new(ScriptedMarketCap::new());
    market_cap.push(Err(SourceError::rate_limited(SourceId::CoinGecko, "429")));

    let date = parse_calendar_date("2023-01-01").expect("date");
    let observation = fetcher(ohlcv, market_cap)
        .resolve(date, &ObservationOverrides::default())
        .await
        .expect("resolution cannot fail");

    // Then: OHLCV fields come from the candle, untouched by the other
    // feed's failure
    assert_eq!(observation.open, candle.open);
    assert_eq!(observation.high, candle.high);
    assert_eq!(observation.low, candle.low);
    assert_eq!(observation.close, candle.close);
    assert_eq!(observation.volume, candle.volume);

    // And: the market cap is estimated from the resolved close
    assert_eq!(
        observation.market_cap,
        candle.close * SYNTHETIC_CIRCULATING_SUPPLY
    );
}

#[tokio::test]
async fn fetched_candle_timestamp_is_authoritative() {
    let ohlcv = Arc::new(ScriptedOhlcv::new());
    ohlcv.push(Ok(vec![sample_candle("2023-01-01T00:00:37Z")]));
    let market_cap = Arc::new(ScriptedMarketCap::new());
    market_cap.push(Ok(610_000_000_000.0));

    let date = parse_calendar_date("2023-01-01").expect("date");
    let observation = fetcher(ohlcv, market_cap)
        .resolve(date, &ObservationOverrides::default())
        .await
        .expect("resolution cannot fail");

    assert_eq!(
        observation.time_open.format_rfc3339(),
        "2023-01-01T00:00:37Z"
    );
}

#[tokio::test]
async fn without_a_candle_the_requested_midnight_anchors_the_day() {
    let observation = fetcher(
        Arc::new(ScriptedOhlcv::new()),
        Arc::new(ScriptedMarketCap::new()),
    )
    .resolve(
        parse_calendar_date("2023-01-01").expect("date"),
        &ObservationOverrides::default(),
    )
    .await
    .expect("resolution cannot fail");

    assert_eq!(
        observation.time_open.format_rfc3339(),
        "2023-01-01T00:00:00Z"
    );
}

#[tokio::test]
async fn caller_values_win_even_when_a_fetch_happens() {
    // Given: today's date forces a fetch despite complete overrides
    let ohlcv = Arc::new(ScriptedOhlcv::new());
    ohlcv.push(Ok(vec![sample_candle("2023-01-01T00:00:00Z")]));
    let market_cap = Arc::new(ScriptedMarketCap::new());
    market_cap.push(Ok(610_000_000_000.0));

    let observation = fetcher(ohlcv.clone(), market_cap.clone())
        .resolve(today_utc(), &full_overrides())
        .await
        .expect("resolution cannot fail");

    // Then: both feeds were consulted for freshness
    assert_eq!(ohlcv.calls(), 1);
    assert_eq!(market_cap.calls(), 1);

    // And: every field is still the caller's
    let overrides = full_overrides();
    assert_eq!(Some(observation.open), overrides.open);
    assert_eq!(Some(observation.high), overrides.high);
    assert_eq!(Some(observation.low), overrides.low);
    assert_eq!(Some(observation.close), overrides.close);
    assert_eq!(Some(observation.volume), overrides.volume);
    assert_eq!(Some(observation.market_cap), overrides.market_cap);
}

#[tokio::test]
async fn partial_overrides_merge_with_fetched_fields() {
    // Given: the caller pins only the close
    let ohlcv = Arc::new(ScriptedOhlcv::new());
    let candle = sample_candle("2023-01-01T00:00:00Z");
    ohlcv.push(Ok(vec![candle]));
    let market_cap = Arc::new(ScriptedMarketCap::new());
    market_cap.push(Ok(610_000_000_000.0));

    let overrides = ObservationOverrides {
        close: Some(28_000.0),
        ..ObservationOverrides::default()
    };

    let date = parse_calendar_date("2023-01-01").expect("date");
    let observation = fetcher(ohlcv, market_cap)
        .resolve(date, &overrides)
        .await
        .expect("resolution cannot fail");

    assert_eq!(observation.close, 28_000.0);
    assert_eq!(observation.open, candle.open);
    assert_eq!(observation.market_cap, 610_000_000_000.0);
}
