//! Scenario tests for the whole scrape-and-record pipeline.
